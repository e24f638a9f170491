//! Application state for the parley TUI.

use parley_engine::{ChatSession, HistoryError, HistoryTicket, Message, SendOutcome};
use ratatui::layout::Rect;
use tracing::{debug, info};

use crate::chat::{transcript_lines, ChatPane};
use crate::commands::{is_command, parse_command, unescape_slash, Command};
use crate::event::Action;
use crate::ui::widgets::TextInputState;

/// Lines moved per scroll step.
const SCROLL_STEP: usize = 1;

/// Main application state.
pub struct App {
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Whether help overlay is visible.
    pub show_help: bool,
    /// The chat session driving the view.
    pub session: ChatSession,
    /// Message composer.
    pub input: TextInputState,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll: usize,
    /// One-line command feedback shown in the status bar.
    pub notice: Option<String>,
    max_scroll: usize,
    page: usize,
    // Length and last id of the list at the last tick
    last_seen: (usize, Option<String>),
}

impl App {
    /// Create a new app around an unbound session.
    pub fn new(session: ChatSession) -> Self {
        Self {
            should_quit: false,
            show_help: false,
            session,
            input: TextInputState::new(),
            scroll: 0,
            notice: None,
            max_scroll: 0,
            page: 10,
            last_seen: (0, None),
        }
    }

    /// Bind the session to its initial conversation.
    pub fn start(&mut self) -> HistoryTicket {
        info!(conversation = %self.session.conversation_id(), "starting chat view");
        self.session.bind()
    }

    /// Handle an action.
    ///
    /// Returns a ticket when the action rebinds the session and a history
    /// fetch has to be issued.
    pub fn handle_action(&mut self, action: Action) -> Option<HistoryTicket> {
        // Global actions
        match action {
            Action::Quit => {
                if self.show_help {
                    self.show_help = false;
                } else {
                    self.should_quit = true;
                }
                return None;
            }
            Action::Help => {
                self.show_help = !self.show_help;
                return None;
            }
            _ => {}
        }

        // If help is showing, any key closes it
        if self.show_help {
            self.show_help = false;
            return None;
        }

        match action {
            Action::Send => return self.submit(),
            Action::Newline => self.input.insert('\n'),
            Action::Insert(c) => self.input.insert(c),
            Action::Backspace => self.input.backspace(),
            Action::Delete => self.input.delete(),
            Action::Left => self.input.move_left(),
            Action::Right => self.input.move_right(),
            Action::Home => self.input.move_home(),
            Action::End => self.input.move_end(),
            Action::ScrollUp => self.scroll_up(SCROLL_STEP),
            Action::ScrollDown => self.scroll_down(SCROLL_STEP),
            Action::PageUp => self.scroll_up(self.page),
            Action::PageDown => self.scroll_down(self.page),
            Action::Quit | Action::Help | Action::None => {}
        }
        None
    }

    /// Insert pasted text at the cursor.
    pub fn paste(&mut self, text: &str) {
        if self.show_help {
            self.show_help = false;
            return;
        }
        // Terminals send CR for line breaks inside a paste
        self.input.insert_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
    }

    /// Submit the composer content as a message or a slash command.
    fn submit(&mut self) -> Option<HistoryTicket> {
        let text = self.input.content().to_string();

        if is_command(&text) {
            self.input.clear();
            return parse_command(&text).and_then(|command| self.run_command(command));
        }

        let text = unescape_slash(&text);
        match self.session.send(&text) {
            SendOutcome::Ignored => {}
            SendOutcome::Sent { local_id } => {
                debug!(%local_id, "message sent");
                self.input.clear();
                self.notice = None;
                self.scroll = 0;
            }
            SendOutcome::RolledBack { local_id, .. } => {
                debug!(%local_id, "message rolled back");
                self.input.clear();
            }
        }
        None
    }

    fn run_command(&mut self, command: Command) -> Option<HistoryTicket> {
        match command {
            Command::Help => {
                self.show_help = true;
                None
            }
            Command::Quit => {
                self.should_quit = true;
                None
            }
            Command::Switch(None) => {
                self.notice = Some("Usage: /switch <conversation-id>".into());
                None
            }
            Command::Switch(Some(id)) => {
                let ticket = self.session.switch_conversation(id.as_str());
                match &ticket {
                    Some(_) => {
                        self.notice = None;
                        self.scroll = 0;
                    }
                    None => self.notice = Some(format!("Already in #{id}")),
                }
                ticket
            }
            Command::Unknown(name) => {
                self.notice = Some(format!("Unknown command: /{name}"));
                None
            }
        }
    }

    /// Install a finished history fetch.
    pub fn apply_history(
        &mut self,
        ticket: &HistoryTicket,
        result: Result<Vec<Message>, HistoryError>,
    ) {
        if self.session.apply_history(ticket, result) {
            self.follow_list();
        }
    }

    /// Tick handler: drain the live channel and keep the view current.
    pub fn tick(&mut self) {
        if self.session.poll_channel() > 0 {
            self.follow_list();
        }
    }

    /// Scroll back to the newest message whenever the list changed.
    fn follow_list(&mut self) {
        let messages = self.session.messages();
        let seen = (messages.len(), messages.last().map(|m| m.id.clone()));
        if seen != self.last_seen {
            self.last_seen = seen;
            self.scroll = 0;
        }
    }

    /// Clamp scrolling to the transcript drawn in `pane` (the chat pane area).
    pub fn fit_scroll(&mut self, pane: Rect) {
        let area = ChatPane::transcript_area(pane);
        let total = transcript_lines(&self.session, area.width).len();
        let height = usize::from(area.height);
        self.max_scroll = total.saturating_sub(height);
        self.page = height.max(1);
        self.scroll = self.scroll.min(self.max_scroll);
    }

    fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, message_from, render_app_to_string};
    use parley_engine::{BindState, ChannelEvent, OutboundEvent};

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_action(Action::Insert(c));
        }
    }

    #[test]
    fn test_send_appends_emits_and_clears_input() {
        let (mut app, link) = create_test_app();
        app.start();

        type_text(&mut app, "hello");
        assert!(app.handle_action(Action::Send).is_none());

        assert!(app.input.is_empty());
        assert_eq!(app.session.messages().len(), 1);
        assert_eq!(app.session.messages()[0].body, "hello");
        let emitted = link.emitted.borrow();
        assert!(matches!(
            emitted.last(),
            Some(OutboundEvent::SendMessage(p)) if p.body == "hello" && p.conversation_id == "c1"
        ));
    }

    #[test]
    fn test_whitespace_send_is_ignored_and_input_kept() {
        let (mut app, link) = create_test_app();
        app.start();

        type_text(&mut app, "   ");
        app.handle_action(Action::Send);

        assert_eq!(app.input.content(), "   ");
        assert!(app.session.messages().is_empty());
        assert!(link.emitted.borrow().is_empty());
    }

    #[test]
    fn test_failed_send_rolls_back_silently() {
        let (mut app, link) = create_test_app();
        app.start();
        link.fail_emit.set(true);

        type_text(&mut app, "lost");
        app.handle_action(Action::Send);

        assert!(app.session.messages().is_empty());
        assert!(app.input.is_empty());
        // Failures are logged only
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_newline_keeps_composing() {
        let (mut app, link) = create_test_app();
        app.start();

        type_text(&mut app, "one");
        app.handle_action(Action::Newline);
        type_text(&mut app, "two");
        app.handle_action(Action::Send);

        assert_eq!(app.session.messages()[0].body, "one\ntwo");
        assert_eq!(link.emitted.borrow().len(), 1);
    }

    #[test]
    fn test_paste_keeps_line_breaks() {
        let (mut app, _link) = create_test_app();
        app.start();

        app.paste("first\r\nsecond\rthird");
        assert_eq!(app.input.content(), "first\nsecond\nthird");

        app.handle_action(Action::Send);
        assert_eq!(app.session.messages()[0].body, "first\nsecond\nthird");
    }

    #[test]
    fn test_escaped_slash_is_sent_as_text() {
        let (mut app, _link) = create_test_app();
        app.start();

        type_text(&mut app, "//shrug");
        app.handle_action(Action::Send);

        assert_eq!(app.session.messages()[0].body, "/shrug");
    }

    #[test]
    fn test_switch_command_rebinds() {
        let (mut app, link) = create_test_app();
        app.start();

        type_text(&mut app, "/switch c2");
        let ticket = app.handle_action(Action::Send).expect("switch should rebind");

        assert_eq!(ticket.conversation_id, "c2");
        assert_eq!(app.session.conversation_id(), "c2");
        assert_eq!(*link.connects.borrow(), vec!["c1".to_string(), "c2".to_string()]);
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_switch_to_same_conversation_is_noop() {
        let (mut app, link) = create_test_app();
        app.start();

        type_text(&mut app, "/switch c1");
        assert!(app.handle_action(Action::Send).is_none());
        assert_eq!(link.connects.borrow().len(), 1);
        assert_eq!(app.notice.as_deref(), Some("Already in #c1"));
    }

    #[test]
    fn test_quit_and_unknown_commands() {
        let (mut app, _link) = create_test_app();
        app.start();

        type_text(&mut app, "/nope");
        app.handle_action(Action::Send);
        assert_eq!(app.notice.as_deref(), Some("Unknown command: /nope"));
        assert!(!app.should_quit);

        type_text(&mut app, "/quit");
        app.handle_action(Action::Send);
        assert!(app.should_quit);
    }

    #[test]
    fn test_help_toggles_and_any_key_closes() {
        let (mut app, _link) = create_test_app();

        app.handle_action(Action::Help);
        assert!(app.show_help);
        app.handle_action(Action::Insert('x'));
        assert!(!app.show_help);
        // The key that closed help is swallowed
        assert!(app.input.is_empty());

        app.handle_action(Action::Help);
        app.handle_action(Action::Quit);
        assert!(!app.show_help);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_tick_joins_and_receives() {
        let (mut app, link) = create_test_app();
        app.start();

        link.inject(ChannelEvent::Connected);
        link.inject(ChannelEvent::Message(message_from("m1", "u2", "hey")));
        app.tick();

        assert_eq!(app.session.state(), BindState::Joined);
        assert!(matches!(
            link.emitted.borrow().first(),
            Some(OutboundEvent::JoinRoom(id)) if id == "c1"
        ));
        assert_eq!(app.session.messages().len(), 1);
    }

    #[test]
    fn test_new_message_scrolls_to_bottom() {
        let (mut app, link) = create_test_app();
        let ticket = app.start();
        let history = (0..30)
            .map(|i| message_from(&format!("m{i}"), "u2", "filler"))
            .collect();
        app.apply_history(&ticket, Ok(history));
        app.fit_scroll(Rect::new(0, 0, 80, 20));

        app.handle_action(Action::PageUp);
        assert!(app.scroll > 0);

        link.inject(ChannelEvent::Message(message_from("m-new", "u2", "fresh")));
        app.tick();
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let (mut app, _link) = create_test_app();
        let ticket = app.start();
        app.apply_history(&ticket, Ok(vec![message_from("m1", "u2", "only one")]));
        app.fit_scroll(Rect::new(0, 0, 80, 20));

        app.handle_action(Action::PageUp);
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn test_history_error_is_silent() {
        let (mut app, _link) = create_test_app();
        let ticket = app.start();

        app.apply_history(&ticket, Err(HistoryError::Status(500)));
        assert!(app.notice.is_none());
        assert!(app.session.messages().is_empty());
        assert!(!render_app_to_string(&app).contains("500"));
    }
}
