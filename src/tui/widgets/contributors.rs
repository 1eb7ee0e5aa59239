// Top contributors widget: who has been awarding the most points.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::board::Contributor;
use crate::tui::ViewState;

/// Render the contributor list into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let lines = match &state.snapshot {
        Some(snapshot) if !snapshot.top_contributors.is_empty() => {
            build_contributor_lines(&snapshot.top_contributors)
        }
        _ => vec![Line::from(Span::styled(
            " No contributors yet",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Top Contributors"));
    frame.render_widget(paragraph, area);
}

fn build_contributor_lines(contributors: &[Contributor]) -> Vec<Line<'static>> {
    contributors
        .iter()
        .enumerate()
        .map(|(rank, c)| {
            Line::from(vec![
                Span::styled(
                    format!(" {}. ", rank + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<28}", display_label(&c.label)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(format!("{:>5}", c.points), Style::default().fg(Color::Cyan)),
            ])
        })
        .collect()
}

/// Contributors are usually labeled by email; show just the mailbox part.
fn display_label(label: &str) -> String {
    match label.split_once('@') {
        Some((mailbox, _)) if !mailbox.is_empty() => mailbox.to_string(),
        _ => label.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
