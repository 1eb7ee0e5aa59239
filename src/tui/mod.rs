// TUI dashboard: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors the driver's state. The driver
// pushes `UiUpdate` messages over an mpsc channel; the TUI applies them to
// `ViewState` and re-renders on a steady tick so the countdown stays live.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::board::BoardSnapshot;
use crate::display::DisplayMode;
use crate::protocol::{BoardStatus, UiUpdate, UserCommand};

use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the driver state for rendering.
#[derive(Debug, Default)]
pub struct ViewState {
    /// The held board snapshot. Survives fetch failures.
    pub snapshot: Option<BoardSnapshot>,
    /// Latest driver status (mode, countdown, override, priority).
    pub status: BoardStatus,
    /// Last fetch error, cleared by the next successful fetch.
    pub last_error: Option<String>,
    /// Presentation mode: board fills the screen, bars hidden.
    pub presentation: bool,
    /// Whether the `:` command line is open.
    pub command_mode: bool,
    pub command_text: String,
}

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Snapshot(snapshot) => {
            state.snapshot = Some(*snapshot);
            state.last_error = None;
        }
        UiUpdate::FetchFailed(message) => {
            state.last_error = Some(message);
        }
        UiUpdate::Status(status) => {
            state.status = *status;
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the complete board frame.
fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area(), state.presentation);

    widgets::status_bar::render(frame, layout.status_bar, state);
    render_message_banner(frame, &layout, state);

    match state.status.mode {
        DisplayMode::Normal => {
            widgets::standings::render(frame, layout.standings, state);
            widgets::activity::render(frame, layout.activity, state);
            widgets::contributors::render(frame, layout.contributors, state);
        }
        DisplayMode::Idle => {
            widgets::idle::render(frame, layout.middle, state);
        }
    }

    render_help_bar(frame, &layout, state);
}

fn render_message_banner(frame: &mut Frame, layout: &layout::BoardLayout, state: &ViewState) {
    let message = state
        .snapshot
        .as_ref()
        .and_then(|s| s.message.as_deref())
        .filter(|_| state.status.mode == DisplayMode::Normal);
    let Some(message) = message else {
        return;
    };
    let paragraph = Paragraph::new(Line::from(message.to_string()).centered()).block(
        ratatui::widgets::Block::default()
            .borders(ratatui::widgets::Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(paragraph, layout.message_banner);
}

fn render_help_bar(frame: &mut Frame, layout: &layout::BoardLayout, state: &ViewState) {
    if layout.help_bar.height == 0 {
        return;
    }
    let line = if state.command_mode {
        Line::from(vec![
            Span::styled(" :", Style::default().fg(Color::Cyan)),
            Span::styled(
                state.command_text.clone(),
                Style::default().fg(Color::White),
            ),
            Span::styled("_", Style::default().fg(Color::Cyan)),
        ])
    } else {
        Line::from(Span::styled(
            " q:Quit | r:Refresh | d:Display override | f:Presentation | ::Command",
            Style::default().fg(Color::White),
        ))
    };
    let paragraph = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on clean exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    // Render tick: 4 fps is plenty for a once-a-second countdown.
    let mut render_tick = tokio::time::interval(Duration::from_millis(250));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    None => break, // driver is shutting down
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {} // resize, mouse: redrawn on next tick
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
