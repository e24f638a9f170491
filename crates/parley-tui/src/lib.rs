//! parley-tui: Terminal UI for the parley chat client
//!
//! This crate provides the TUI layer for parley, including:
//! - The chat pane (transcript and composer)
//! - Slash commands for switching conversations
//! - Status bar and help overlay
//! - The event loop tying the engine's session to the terminal

mod app;
mod chat;
pub mod commands;
mod event;
mod screen;
#[cfg(test)]
pub mod test_utils;
mod text;
mod ui;

pub use app::App;
pub use event::{Action, Event, EventHandler};
pub use parley_engine;

use crossterm::{
    cursor::Show as ShowCursor,
    event::{
        DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parley_engine::{
    fetch_ticket, ChatSession, Config, HistoryResult, HistorySource, HistoryTicket, HttpHistory,
    LiveConnector, Participants,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Tick interval for channel polling and redraws.
const TICK_MS: u64 = 100;

type HistoryHandle = JoinHandle<HistoryResult>;

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            stdout(),
            DisableBracketedPaste,
            DisableMouseCapture,
            LeaveAlternateScreen,
            ShowCursor
        );
    }
}

/// Run the TUI application.
///
/// Opens a chat view on `conversation_id` against the configured backend,
/// runs the event loop, and restores the terminal on exit.
pub async fn run_tui(
    config: Config,
    participants: Participants,
    conversation_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let history: Arc<dyn HistorySource> = Arc::new(HttpHistory::new(config.clone())?);
    let session = ChatSession::new(
        Box::new(LiveConnector::new(config)),
        participants,
        conversation_id,
    );

    // Setup terminal with RAII guard for cleanup
    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session);
    let mut events = EventHandler::new(TICK_MS);

    let result = run_loop(&mut terminal, &mut app, &mut events, &history).await;

    // Release the live channel before the terminal is restored
    app.session.unbind();
    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
    history: &Arc<dyn HistorySource>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut history_handles: Vec<HistoryHandle> = Vec::new();

    let ticket = app.start();
    history_handles.push(spawn_history(history, ticket));

    loop {
        // Draw
        terminal.draw(|frame| {
            let area = frame.area();
            let (main, _) = ui::main_layout(area);
            app.fit_scroll(main);
            screen::render(app, area, frame.buffer_mut());
        })?;

        // Check for completed history fetches (non-blocking)
        apply_finished(app, &mut history_handles).await;

        // Handle events
        if let Some(event) = events.next().await {
            let ticket = match event {
                Event::Key(key) => app.handle_action(event::key_to_action(key)),
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.handle_action(Action::ScrollUp),
                    MouseEventKind::ScrollDown => app.handle_action(Action::ScrollDown),
                    _ => None,
                },
                Event::Paste(text) => {
                    app.paste(&text);
                    None
                }
                // Terminal will handle resize automatically
                Event::Tick | Event::Resize(_, _) => None,
            };
            if let Some(ticket) = ticket {
                history_handles.push(spawn_history(history, ticket));
            }
        }

        app.tick();

        if app.should_quit {
            break;
        }
    }

    for handle in history_handles {
        handle.abort();
    }

    Ok(())
}

fn spawn_history(history: &Arc<dyn HistorySource>, ticket: HistoryTicket) -> HistoryHandle {
    tokio::spawn(fetch_ticket(Arc::clone(history), ticket))
}

/// Hand every finished history fetch to the app, leaving pending ones queued.
async fn apply_finished(app: &mut App, handles: &mut Vec<HistoryHandle>) {
    let mut completed = Vec::new();
    for (i, handle) in handles.iter().enumerate() {
        if handle.is_finished() {
            completed.push(i);
        }
    }
    for i in completed.into_iter().rev() {
        match handles.remove(i).await {
            Ok((ticket, result)) => app.apply_history(&ticket, result),
            Err(e) => warn!(error = %e, "history task failed"),
        }
    }
}
