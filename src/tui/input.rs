// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// driver, or into local ViewState mutations (presentation toggle, command
// entry).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::ViewState;
use crate::protocol::UserCommand;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to
/// the driver (refresh, override, priority, quit). Returns `None` when the
/// key press was handled locally by mutating `ViewState`.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits regardless of mode (escape hatch)
    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.command_mode {
        return handle_command_mode(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Char('q') => Some(UserCommand::Quit),

        // Presentation mode: board fills the screen, bars hidden.
        KeyCode::Char('f') => {
            view_state.presentation = !view_state.presentation;
            None
        }
        KeyCode::Esc => {
            view_state.presentation = false;
            None
        }

        KeyCode::Char('r') => Some(UserCommand::ForceRefresh),
        KeyCode::Char('d') => Some(UserCommand::CycleOverride),

        // Command entry for priority activation.
        KeyCode::Char(':') => {
            view_state.command_mode = true;
            view_state.command_text.clear();
            None
        }

        _ => None,
    }
}

/// Handle key events while the command line is open.
///
/// Enter submits, Esc cancels, Backspace edits; everything else is
/// appended as text.
fn handle_command_mode(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            view_state.command_mode = false;
            view_state.command_text.clear();
            None
        }
        KeyCode::Enter => {
            view_state.command_mode = false;
            let command = parse_command(&view_state.command_text);
            view_state.command_text.clear();
            command
        }
        KeyCode::Backspace => {
            view_state.command_text.pop();
            None
        }
        KeyCode::Char(c) => {
            view_state.command_text.push(c);
            None
        }
        _ => None,
    }
}

/// Parse a submitted command line.
///
/// `priority <key>` claims the priority lease with the given activation
/// key; `release` gives it up. Anything else is ignored.
pub(crate) fn parse_command(text: &str) -> Option<UserCommand> {
    let text = text.trim();
    if let Some(key) = text.strip_prefix("priority ") {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        return Some(UserCommand::ActivatePriority {
            key: key.to_string(),
        });
    }
    if text == "release" {
        return Some(UserCommand::ReleasePriority);
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
