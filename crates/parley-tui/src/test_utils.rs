//! Test utilities for parley-tui rendering and app tests.
//!
//! This module provides helper functions for creating test terminals,
//! sessions wired to an in-memory channel, and converting buffers to
//! strings for assertions.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::Utc;
use parley_engine::{
    ChannelError, ChannelEvent, ChannelLink, ChatSession, Connector, Emitter, Message,
    OutboundEvent, Participants, Roster, RosterEntry,
};
use ratatui::{backend::TestBackend, buffer::Buffer, layout::Rect, Terminal};
use tokio::sync::mpsc;

use crate::app::App;

/// Default terminal width for tests.
pub const TEST_WIDTH: u16 = 80;

/// Default terminal height for tests.
pub const TEST_HEIGHT: u16 = 24;

/// Conversation every test session starts in.
pub const TEST_CONVERSATION: &str = "c1";

/// Create a test terminal with the default dimensions (80x24).
pub fn create_test_terminal() -> Terminal<TestBackend> {
    create_test_terminal_sized(TEST_WIDTH, TEST_HEIGHT)
}

/// Create a test terminal with custom dimensions.
pub fn create_test_terminal_sized(width: u16, height: u16) -> Terminal<TestBackend> {
    let backend = TestBackend::new(width, height);
    Terminal::new(backend).expect("Failed to create test terminal")
}

/// What the in-memory channel has seen, shared with the test.
#[derive(Default)]
pub struct FakeLink {
    pub connects: RefCell<Vec<String>>,
    pub emitted: RefCell<Vec<OutboundEvent>>,
    senders: RefCell<Vec<mpsc::UnboundedSender<ChannelEvent>>>,
    pub fail_emit: Cell<bool>,
}

impl FakeLink {
    /// Deliver an event on the most recent connection.
    pub fn inject(&self, event: ChannelEvent) {
        let senders = self.senders.borrow();
        senders
            .last()
            .expect("no connection opened")
            .send(event)
            .expect("connection dropped");
    }
}

struct FakeConnector(Rc<FakeLink>);

struct FakeEmitter(Rc<FakeLink>);

impl Emitter for FakeEmitter {
    fn emit(&self, event: OutboundEvent) -> Result<(), ChannelError> {
        if self.0.fail_emit.get() {
            return Err(ChannelError::Closed);
        }
        self.0.emitted.borrow_mut().push(event);
        Ok(())
    }
}

impl Connector for FakeConnector {
    fn connect(&self, conversation_id: &str) -> Result<ChannelLink, ChannelError> {
        self.0.connects.borrow_mut().push(conversation_id.to_string());
        let (tx, rx) = mpsc::unbounded_channel();
        self.0.senders.borrow_mut().push(tx);
        Ok(ChannelLink {
            emitter: Box::new(FakeEmitter(Rc::clone(&self.0))),
            events: rx,
        })
    }
}

/// Participants used by every test: Ana (`u1`, local) talking to Ben (`u2`).
pub fn test_participants() -> Participants {
    Participants {
        current_user: "u1".into(),
        counterpart: "u2".into(),
        roster: Roster::new(vec![
            RosterEntry {
                id: "u1".into(),
                name: "Ana".into(),
            },
            RosterEntry {
                id: "u2".into(),
                name: "Ben".into(),
            },
        ]),
    }
}

/// Create an unbound session on an in-memory channel.
pub fn create_test_session() -> (ChatSession, Rc<FakeLink>) {
    let link = Rc::new(FakeLink::default());
    let session = ChatSession::new(
        Box::new(FakeConnector(Rc::clone(&link))),
        test_participants(),
        TEST_CONVERSATION,
    );
    (session, link)
}

/// Create a test app with a fresh, unbound session.
pub fn create_test_app() -> (App, Rc<FakeLink>) {
    let (session, link) = create_test_session();
    (App::new(session), link)
}

/// A server-side message in the test conversation.
pub fn message_from(id: &str, sender: &str, body: &str) -> Message {
    Message {
        id: id.into(),
        conversation_id: TEST_CONVERSATION.into(),
        sender: sender.into(),
        body: body.into(),
        created_at: Utc::now(),
    }
}

/// Convert a buffer to a string representation for assertions.
///
/// Trailing whitespace is trimmed from each row.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut result = String::new();

    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            let cell = buffer.cell((x, y)).unwrap();
            result.push_str(cell.symbol());
        }
        // Trim trailing whitespace from each line
        while result.ends_with(' ') {
            result.pop();
        }
        result.push('\n');
    }

    // Remove trailing newline
    if result.ends_with('\n') {
        result.pop();
    }

    result
}

/// Render the whole app to a string at the default test size.
pub fn render_app_to_string(app: &App) -> String {
    let area = Rect::new(0, 0, TEST_WIDTH, TEST_HEIGHT);
    let mut buffer = Buffer::empty(area);
    crate::screen::render(app, area, &mut buffer);
    buffer_to_string(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_terminal() {
        let terminal = create_test_terminal();
        let size = terminal.size().unwrap();
        assert_eq!(size.width, TEST_WIDTH);
        assert_eq!(size.height, TEST_HEIGHT);
    }

    #[test]
    fn test_fake_link_records_connects() {
        let (mut session, link) = create_test_session();
        session.bind();
        assert_eq!(*link.connects.borrow(), vec![TEST_CONVERSATION.to_string()]);
    }

    #[test]
    fn test_buffer_to_string() {
        let area = Rect::new(0, 0, 10, 3);
        let mut buffer = Buffer::empty(area);
        buffer.set_string(0, 0, "Hello", ratatui::style::Style::default());
        buffer.set_string(0, 1, "World", ratatui::style::Style::default());

        let result = buffer_to_string(&buffer);
        assert_eq!(result, "Hello\nWorld\n");
    }
}
