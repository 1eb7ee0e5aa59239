// Latest activity widget: the newest point awards with elapsed time.

use chrono::{DateTime, FixedOffset};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::board::{est_now, format_time_ago, RecentEvent};
use crate::tui::ViewState;

/// Render the latest activity list into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let lines = match &state.snapshot {
        Some(snapshot) if !snapshot.recent_events.is_empty() => {
            build_activity_lines(&snapshot.recent_events, est_now())
        }
        _ => vec![Line::from(Span::styled(
            " No recent activity",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Latest Activity"));
    frame.render_widget(paragraph, area);
}

/// One line per event: points, house, and how long ago.
fn build_activity_lines(events: &[RecentEvent], now: DateTime<FixedOffset>) -> Vec<Line<'static>> {
    events
        .iter()
        .map(|event| {
            let sign = if event.points >= 0 { "+" } else { "" };
            let points_color = if event.points >= 0 {
                Color::Green
            } else {
                Color::Red
            };
            Line::from(vec![
                Span::styled(
                    format!(" {sign}{} ", event.points),
                    Style::default()
                        .fg(points_color)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(event.house.clone(), Style::default().fg(Color::White)),
                Span::styled(
                    format!("  {}", format_time_ago(&event.timestamp, now)),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
