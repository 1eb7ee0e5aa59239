// Screen layout: panel arrangement and sizing.
//
// Divides the terminal into fixed zones for the board:
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Message Banner (3 rows, announcements)            |
// +-------------------------+------------------------+
// | Standings (60%)          | Sidebar (40%)          |
// |                          | +- Activity (50%) ----+|
// |                          | +- Contributors (50%)-+|
// +-------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+
//
// Presentation mode collapses the status and help bars to zero height so
// the board fills the screen on a hallway display.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each board zone.
#[derive(Debug, Clone)]
pub struct BoardLayout {
    /// Top row: countdown, fetch state, override, priority.
    pub status_bar: Rect,
    /// Announcement banner from the sheet's `message` field.
    pub message_banner: Rect,
    /// Left side of the middle section: the standings table.
    pub standings: Rect,
    /// Right sidebar top: latest point awards.
    pub activity: Rect,
    /// Right sidebar bottom: top contributors.
    pub contributors: Rect,
    /// Bottom row: keyboard shortcut hints (doubles as command entry).
    pub help_bar: Rect,
    /// The whole middle section, used by the idle screen.
    pub middle: Rect,
}

/// Build the board layout from the available terminal area.
pub fn build_layout(area: Rect, presentation: bool) -> BoardLayout {
    let bar = if presentation { 0 } else { 1 };

    // Vertical: status(1) | banner(3) | middle(fill) | help(1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(bar),
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(bar),
        ])
        .split(area);

    let status_bar = vertical[0];
    let message_banner = vertical[1];
    let middle = vertical[2];
    let help_bar = vertical[3];

    // Horizontal: standings (60%) | sidebar (40%)
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(middle);

    let standings = horizontal[0];
    let sidebar = horizontal[1];

    let sidebar_sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(sidebar);

    BoardLayout {
        status_bar,
        message_banner,
        standings,
        activity: sidebar_sections[0],
        contributors: sidebar_sections[1],
        help_bar,
        middle,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
