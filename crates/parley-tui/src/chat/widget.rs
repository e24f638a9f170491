//! Chat pane widget.
//!
//! Combines the transcript (scrollable history) with an input area at the bottom.

use parley_engine::ChatSession;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    symbols::line,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::text::truncate_to_width;
use crate::ui::theme::Styles;
use crate::ui::widgets::TextInputState;

use super::transcript::transcript_lines;

/// Fixed height for the input area (in lines).
const INPUT_HEIGHT: u16 = 3;

/// Height for the divider line.
const DIVIDER_HEIGHT: u16 = 1;

/// Shown in the input area while it is empty.
pub const INPUT_PLACEHOLDER: &str = "Type your message here...";

/// Chat pane widget combining transcript and input.
///
/// ```text
/// ┌─ Chat with Ben ──────────────────────┐
/// │ Ben: are we still on for friday?     │
/// │ 09:12                                │
/// │                                      │
/// │                      You: yes, 7pm   │
/// │                              09:14   │
/// ├──────────────────────────────────────┤
/// │ > Type your message here...          │
/// └──────────────────────────────────────┘
/// ```
pub struct ChatPane<'a> {
    session: &'a ChatSession,
    input: &'a TextInputState,
    scroll: usize,
    focused: bool,
}

impl<'a> ChatPane<'a> {
    /// Create a new chat pane.
    pub fn new(session: &'a ChatSession, input: &'a TextInputState) -> Self {
        Self {
            session,
            input,
            scroll: 0,
            focused: false,
        }
    }

    /// Lines scrolled up from the bottom of the transcript.
    #[must_use]
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Set whether this pane is focused.
    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Area the transcript occupies when the pane is drawn into `area`.
    pub fn transcript_area(area: Rect) -> Rect {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        let height = inner.height.saturating_sub(INPUT_HEIGHT + DIVIDER_HEIGHT);
        Rect::new(inner.x, inner.y, inner.width, height)
    }

    fn render_transcript(&self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let lines = transcript_lines(self.session, area.width);
        if lines.is_empty() {
            let y = area.y + area.height / 2;
            Paragraph::new(Line::from(Span::styled("No messages yet", Styles::dim())))
                .alignment(Alignment::Center)
                .render(Rect::new(area.x, y, area.width, 1), buf);
            return;
        }

        // Bottom-anchored: scroll 0 shows the newest lines
        let height = usize::from(area.height);
        let max_offset = lines.len().saturating_sub(height);
        let offset = max_offset.saturating_sub(self.scroll);
        let visible: Vec<Line<'static>> = lines.into_iter().skip(offset).take(height).collect();

        Paragraph::new(visible).render(area, buf);
    }

    fn render_input(&self, area: Rect, buf: &mut Buffer) {
        let prompt = "> ";

        if self.input.is_empty() {
            let mut spans = vec![Span::styled(prompt, Styles::active())];
            if self.focused {
                spans.push(Span::styled("_", Styles::default()));
            }
            spans.push(Span::styled(INPUT_PLACEHOLDER, Styles::dim()));
            Paragraph::new(Line::from(spans)).render(area, buf);
            return;
        }

        let cursor_pos = self.input.cursor;
        let mut lines: Vec<Line<'_>> = Vec::new();
        let mut spans: Vec<Span<'_>> = vec![Span::styled(prompt, Styles::active())];
        let mut cursor_drawn = false;

        for (i, ch) in self.input.content().chars().enumerate() {
            if self.focused && i == cursor_pos && !cursor_drawn {
                spans.push(Span::styled("|", Styles::active()));
                cursor_drawn = true;
            }
            if ch == '\n' {
                lines.push(Line::from(std::mem::take(&mut spans)));
                // Continuation lines line up with the text after the prompt
                spans.push(Span::raw(" ".repeat(prompt.len())));
            } else {
                spans.push(Span::styled(ch.to_string(), Styles::default()));
            }
        }
        if self.focused && !cursor_drawn {
            spans.push(Span::styled("_", Styles::default()));
        }
        lines.push(Line::from(spans));

        // Keep the line with the cursor in view
        let overflow = lines.len().saturating_sub(usize::from(area.height));
        let lines: Vec<Line<'_>> = lines.into_iter().skip(overflow).collect();
        Paragraph::new(lines).render(area, buf);
    }

    fn render_divider(area: Rect, buf: &mut Buffer) {
        if area.width == 0 {
            return;
        }
        let divider = line::HORIZONTAL.repeat(usize::from(area.width));
        Paragraph::new(Line::from(Span::styled(divider, Styles::border()))).render(area, buf);
    }
}

impl Widget for ChatPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Styles::border_active()
        } else {
            Styles::border()
        };

        let name_room = usize::from(area.width.saturating_sub(14));
        let title = format!(
            " Chat with {} ",
            truncate_to_width(self.session.counterpart_name(), name_room)
        );
        let block = Block::default()
            .title(title)
            .title_style(Styles::title())
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Styles::default());

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height < INPUT_HEIGHT + DIVIDER_HEIGHT + 1 {
            // Not enough space - just show input
            self.render_input(inner, buf);
            return;
        }

        let transcript_area = Self::transcript_area(area);
        let divider_y = transcript_area.y + transcript_area.height;
        let divider_area = Rect::new(inner.x, divider_y, inner.width, DIVIDER_HEIGHT);
        let input_area = Rect::new(inner.x, divider_y + DIVIDER_HEIGHT, inner.width, INPUT_HEIGHT);

        self.render_transcript(transcript_area, buf);
        Self::render_divider(divider_area, buf);
        self.render_input(input_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        buffer_to_string, create_test_session, create_test_terminal_sized, message_from,
    };

    fn render(session: &ChatSession, input: &TextInputState, scroll: usize) -> String {
        let mut terminal = create_test_terminal_sized(60, 16);
        terminal
            .draw(|frame| {
                let pane = ChatPane::new(session, input).scroll(scroll).focused(true);
                frame.render_widget(pane, frame.area());
            })
            .unwrap();
        buffer_to_string(terminal.backend().buffer())
    }

    #[test]
    fn test_chat_pane_title_and_placeholder() {
        let (session, _) = create_test_session();
        let input = TextInputState::new();

        let text = render(&session, &input, 0);
        assert!(text.contains("Chat with Ben"));
        assert!(text.contains(INPUT_PLACEHOLDER));
        assert!(text.contains("No messages yet"));
    }

    #[test]
    fn test_chat_pane_shows_typed_text_instead_of_placeholder() {
        let (session, _) = create_test_session();
        let mut input = TextInputState::new();
        input.insert_str("see you soon");

        let text = render(&session, &input, 0);
        assert!(text.contains("> see you soon_"));
        assert!(!text.contains(INPUT_PLACEHOLDER));
    }

    #[test]
    fn test_chat_pane_anchors_to_newest_message() {
        let (mut session, _) = create_test_session();
        let ticket = session.bind();
        let history = (0..20)
            .map(|i| message_from(&format!("m{i}"), "u2", &format!("note {i}")))
            .collect();
        session.apply_history(&ticket, Ok(history));
        let input = TextInputState::new();

        let bottom = render(&session, &input, 0);
        assert!(bottom.contains("note 19"));
        assert!(!bottom.contains("Ben: note 0 "));

        let top = render(&session, &input, usize::MAX);
        assert!(top.contains("Ben: note 0 "));
        assert!(!top.contains("note 19"));
    }

    #[test]
    fn test_chat_pane_minimum_size() {
        let (session, _) = create_test_session();
        let input = TextInputState::new();
        let mut terminal = create_test_terminal_sized(20, 5);

        terminal
            .draw(|frame| {
                frame.render_widget(ChatPane::new(&session, &input), frame.area());
            })
            .unwrap();
    }

    #[test]
    fn test_transcript_area_leaves_room_for_input() {
        let area = ChatPane::transcript_area(Rect::new(0, 0, 60, 16));
        assert_eq!(area, Rect::new(1, 1, 58, 10));
    }
}
