// Status bar: refresh countdown, override state, priority, and the last
// fetch error.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::display::ManualOverride;
use crate::protocol::BoardStatus;
use crate::tui::ViewState;

/// Render the status bar into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    if area.height == 0 {
        return;
    }
    let paragraph = Paragraph::new(build_status_line(&state.status, state.last_error.as_deref()))
        .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

/// Build the single status line.
pub(crate) fn build_status_line(
    status: &BoardStatus,
    last_error: Option<&str>,
) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!(" {}", refresh_text(status)),
        Style::default().fg(Color::White),
    )];

    if status.manual_override != ManualOverride::Auto {
        spans.push(Span::styled(
            format!(" | display: {}", status.manual_override.label()),
            Style::default().fg(Color::Yellow),
        ));
    }

    if status.priority_holder {
        spans.push(Span::styled(
            " | PRIORITY",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(error) = last_error {
        spans.push(Span::styled(
            format!(" | retrying: {error}"),
            Style::default().fg(Color::Red),
        ));
    }

    Line::from(spans)
}

/// The leading refresh segment: in-flight, blocked, counting down, or
/// sleeping through quiet hours.
fn refresh_text(status: &BoardStatus) -> String {
    if status.fetching {
        return "updating...".to_string();
    }
    if let Some(reason) = &status.block_reason {
        return reason.clone();
    }
    match status.next_refresh_secs {
        Some(secs) if status.quiet && status.manual_override != ManualOverride::ForcedOn => {
            format!("quiet hours, next check in {}", humanize(secs))
        }
        Some(secs) => format!("next refresh in {}", humanize(secs)),
        None => "refresh pending".to_string(),
    }
}

fn humanize(secs: u64) -> String {
    if secs >= 120 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
