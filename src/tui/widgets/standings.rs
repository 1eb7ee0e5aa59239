// Standings widget: houses ranked by points, with a total line.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::board::House;
use crate::tui::ViewState;

/// Render the standings table into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let lines = match &state.snapshot {
        Some(snapshot) => {
            let mut lines = build_standings_lines(&snapshot.houses);
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(" Total awarded: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("{}", snapshot.total_points()),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            lines
        }
        None => vec![Line::from(Span::styled(
            " Waiting for board data...",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Standings"));
    frame.render_widget(paragraph, area);
}

/// One line per house: rank, name, points, and a bar scaled to the leader.
fn build_standings_lines(houses: &[House]) -> Vec<Line<'static>> {
    let leader = houses.iter().map(|h| h.points).max().unwrap_or(0).max(1);

    houses
        .iter()
        .enumerate()
        .map(|(rank, house)| {
            let color = parse_hex_color(&house.color).unwrap_or(Color::White);
            let bar_len = ((house.points.max(0) * 20) / leader) as usize;
            Line::from(vec![
                Span::styled(
                    format!(" {:>2}. ", rank + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<20}", house.name),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:>6}  ", house.points),
                    Style::default().fg(Color::White),
                ),
                Span::styled("█".repeat(bar_len), Style::default().fg(color)),
            ])
        })
        .collect()
}

/// Parse a `#rrggbb` hex string into a terminal color.
pub fn parse_hex_color(raw: &str) -> Option<Color> {
    let hex = raw.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardSnapshot;

    fn house(name: &str, points: i64, color: &str) -> House {
        House {
            name: name.into(),
            points,
            color: color.into(),
        }
    }

    #[test]
    fn parse_hex_color_valid() {
        assert_eq!(parse_hex_color("#ff0000"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(parse_hex_color(" #00ff7f "), Some(Color::Rgb(0, 255, 127)));
    }

    #[test]
    fn parse_hex_color_invalid() {
        assert_eq!(parse_hex_color("ff0000"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(parse_hex_color(""), None);
    }

    #[test]
    fn one_line_per_house() {
        let houses = vec![house("A", 10, "#ff0000"), house("B", 5, "#00ff00")];
        assert_eq!(build_standings_lines(&houses).len(), 2);
    }

    #[test]
    fn leader_gets_full_bar() {
        let houses = vec![house("A", 40, "#ff0000"), house("B", 20, "#00ff00")];
        let lines = build_standings_lines(&houses);
        let bar_a = lines[0].spans.last().unwrap().content.chars().count();
        let bar_b = lines[1].spans.last().unwrap().content.chars().count();
        assert_eq!(bar_a, 20);
        assert_eq!(bar_b, 10);
    }

    #[test]
    fn zero_and_negative_points_do_not_panic() {
        let houses = vec![house("A", 0, "#ff0000"), house("B", -5, "#00ff00")];
        let lines = build_standings_lines(&houses);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn render_does_not_panic_without_snapshot() {
        let backend = ratatui::backend::TestBackend::new(60, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }

    #[test]
    fn render_does_not_panic_with_data() {
        let backend = ratatui::backend::TestBackend::new(60, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        state.snapshot = Some(BoardSnapshot {
            houses: vec![
                house("Newton Hill", 120, "#0000ff"),
                house("Union Hill", 75, "#ff0000"),
            ],
            ..Default::default()
        });
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
