// Idle screen: shown during quiet hours, when the sheet disables the
// board, or when no data has arrived yet.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

/// Render the idle screen over the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (headline, detail) = idle_text(state);

    // Center the two lines vertically.
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .split(area);

    let headline_style = if state.status.late_night {
        Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    };
    frame.render_widget(
        Paragraph::new(Line::from(headline).centered()).style(headline_style),
        vertical[1],
    );
    frame.render_widget(
        Paragraph::new(Line::from(detail).centered()).style(Style::default().fg(Color::DarkGray)),
        vertical[2],
    );
}

/// Pick the idle screen text for the current state.
pub(crate) fn idle_text(state: &ViewState) -> (String, String) {
    if state.snapshot.is_none() && !state.status.quiet {
        return (
            "Warming up".to_string(),
            "Waiting for the first board update".to_string(),
        );
    }
    if state.status.late_night {
        return (
            "The hills are asleep".to_string(),
            "Points return in the morning".to_string(),
        );
    }
    if state.status.quiet {
        return (
            "Quiet hours".to_string(),
            "The board wakes up with the school day".to_string(),
        );
    }
    (
        "The board is resting".to_string(),
        "Check back soon".to_string(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
