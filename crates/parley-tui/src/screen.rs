//! Top-level screen rendering.

use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use crate::app::App;
use crate::chat::ChatPane;
use crate::commands::COMMANDS;
use crate::ui::theme::{state_style, Styles};
use crate::ui::widgets::{KeyHint, StatusBar};
use crate::ui::{centered_fixed, main_layout};

/// Render the chat view, status bar and (when visible) the help overlay.
pub fn render(app: &App, area: Rect, buf: &mut Buffer) {
    let (main, status) = main_layout(area);

    ChatPane::new(&app.session, &app.input)
        .scroll(app.scroll)
        .focused(!app.show_help)
        .render(main, buf);

    let state = app.session.state();
    let state_label = state.to_string();
    // A notice takes the room of the longer hints
    let (right, hints) = match &app.notice {
        Some(notice) => (notice.clone(), vec![KeyHint::new("F1", "help")]),
        None => (
            format!("#{}", app.session.conversation_id()),
            vec![
                KeyHint::new("Enter", "send"),
                KeyHint::new("S-Enter", "newline"),
                KeyHint::new("F1", "help"),
                KeyHint::new("Esc", "quit"),
            ],
        ),
    };
    StatusBar::new(&state_label)
        .mode_style(state_style(state))
        .hints(hints)
        .right(&right)
        .render(status, buf);

    if app.show_help {
        render_help_overlay(area, buf);
    }
}

/// Render the help overlay on top of the current screen.
pub fn render_help_overlay(area: Rect, buf: &mut Buffer) {
    use ratatui::widgets::{Block, Borders, Clear, Paragraph};

    let mut help_text = String::from(
        "
  Keys
    Enter             Send message
    Shift+Enter       New line
    Up/Down, PgUp/Dn  Scroll history
    F1                Toggle this help
    Esc / Ctrl+C      Quit

  Commands
",
    );
    for cmd in COMMANDS {
        let usage = match cmd.argument {
            Some(arg) => format!("/{} {arg}", cmd.name),
            None => format!("/{}", cmd.name),
        };
        help_text.push_str(&format!("    {usage:<26}{}\n", cmd.description));
    }
    help_text.push_str("\n  [Press any key to close]\n");

    let width = 64.min(area.width.saturating_sub(4));
    let height = 18.min(area.height.saturating_sub(4));
    let overlay_area = centered_fixed(width, height, area);

    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Help ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    Paragraph::new(help_text)
        .block(block)
        .style(Styles::default())
        .render(overlay_area, buf);
}
