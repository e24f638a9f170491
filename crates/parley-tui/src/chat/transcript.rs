//! Message list rendering.

use chrono::Local;
use parley_engine::{ChatSession, Message};
use ratatui::text::{Line, Span};

use crate::text::{visual_width, wrap_text};
use crate::ui::theme::Styles;

/// Share of the pane width a message bubble may take.
pub const BUBBLE_PERCENT: usize = 60;

/// Build the display lines for every message in the session.
///
/// Own messages are labelled "You" and pushed to the right edge; all
/// others are labelled with the sender's display name and sit on the
/// left. A blank line separates consecutive messages.
pub fn transcript_lines(session: &ChatSession, width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width);
    // Two cells of padding inside each bubble
    let bubble = (width * BUBBLE_PERCENT / 100).max(12).min(width);
    let text_width = bubble.saturating_sub(2).max(1);

    let mut lines = Vec::new();
    for (i, message) in session.messages().iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        let own = session.is_own(message);
        let label = if own { "You" } else { session.sender_name(message) };
        push_bubble(&mut lines, label, message, own, width, text_width);
    }
    lines
}

fn push_bubble(
    lines: &mut Vec<Line<'static>>,
    label: &str,
    message: &Message,
    own: bool,
    width: usize,
    text_width: usize,
) {
    let style = if own {
        Styles::own_message()
    } else {
        Styles::other_message()
    };

    let text = format!("{label}: {}", message.body);
    for row in wrap_text(&text, text_width) {
        let cell = format!(" {row} ");
        if own {
            let pad = width.saturating_sub(visual_width(&cell));
            lines.push(Line::from(vec![
                Span::raw(" ".repeat(pad)),
                Span::styled(cell, style),
            ]));
        } else {
            lines.push(Line::from(Span::styled(cell, style)));
        }
    }

    let stamp = message
        .created_at
        .with_timezone(&Local)
        .format("%H:%M")
        .to_string();
    if own {
        let pad = width.saturating_sub(visual_width(&stamp) + 1);
        lines.push(Line::from(vec![
            Span::raw(" ".repeat(pad)),
            Span::styled(stamp, Styles::dim()),
        ]));
    } else {
        lines.push(Line::from(Span::styled(format!(" {stamp}"), Styles::dim())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_session, message_from};

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_empty_session_has_no_lines() {
        let (session, _) = create_test_session();
        assert!(transcript_lines(&session, 80).is_empty());
    }

    #[test]
    fn test_own_and_other_labels() {
        let (mut session, _) = create_test_session();
        let ticket = session.bind();
        session.apply_history(
            &ticket,
            Ok(vec![
                message_from("m1", "u2", "hi there"),
                message_from("m2", "u1", "hello"),
            ]),
        );

        let lines: Vec<String> = transcript_lines(&session, 80).iter().map(line_text).collect();
        assert!(lines[0].contains("Ben: hi there"));
        assert!(lines.iter().any(|l| l.contains("You: hello")));
        // Own bubble is flush right
        let own = lines.iter().find(|l| l.contains("You: hello")).unwrap();
        assert!(own.starts_with("  "));
        assert_eq!(visual_width(own), 80);
    }

    #[test]
    fn test_long_bodies_wrap_within_bubble() {
        let (mut session, _) = create_test_session();
        let ticket = session.bind();
        let body = "word ".repeat(30);
        session.apply_history(&ticket, Ok(vec![message_from("m1", "u2", body.trim())]));

        let lines = transcript_lines(&session, 50);
        // Several text rows plus the timestamp row
        assert!(lines.len() > 3);
        for line in &lines {
            assert!(visual_width(&line_text(line)) <= 50);
        }
    }
}
