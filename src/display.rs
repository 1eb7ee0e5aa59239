// Display state machine: which of the mutually exclusive screens to show.
//
// `compute_mode` is the single decision point for Normal vs Idle. Loading
// and error indicators are overlay flags carried in the TUI's ViewState and
// never demote a Normal board; stale standings keep rendering next to the
// error line.

use crate::board::BoardSnapshot;

/// Manual display override, cycled by the operator.
///
/// Modeled as an explicit tagged value so "no override" and "override
/// cleared" cannot be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManualOverride {
    #[default]
    Auto,
    ForcedOn,
    ForcedOff,
}

impl ManualOverride {
    /// Cycle auto -> forced-on -> forced-off -> auto.
    pub fn next(self) -> Self {
        match self {
            ManualOverride::Auto => ManualOverride::ForcedOn,
            ManualOverride::ForcedOn => ManualOverride::ForcedOff,
            ManualOverride::ForcedOff => ManualOverride::Auto,
        }
    }

    /// Short label for the status line.
    pub fn label(self) -> &'static str {
        match self {
            ManualOverride::Auto => "auto",
            ManualOverride::ForcedOn => "forced on",
            ManualOverride::ForcedOff => "forced off",
        }
    }
}

/// The main screen the dashboard presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// The standings board.
    Normal,
    /// The quiet-hours / disabled / no-data screen.
    Idle,
}

/// Decide the display mode from the held snapshot, the schedule state, and
/// the manual override.
///
/// Priority order:
/// 1. A non-auto override fully determines the mode.
/// 2. Quiet window -> Idle.
/// 3. Sheet-side `displayEnabled = false` -> Idle.
/// 4. No snapshot, or a snapshot without houses -> Idle.
/// 5. Otherwise Normal.
pub fn compute_mode(
    snapshot: Option<&BoardSnapshot>,
    in_quiet_window: bool,
    manual_override: ManualOverride,
) -> DisplayMode {
    match manual_override {
        ManualOverride::ForcedOn => return DisplayMode::Normal,
        ManualOverride::ForcedOff => return DisplayMode::Idle,
        ManualOverride::Auto => {}
    }

    if in_quiet_window {
        return DisplayMode::Idle;
    }

    let Some(snapshot) = snapshot else {
        return DisplayMode::Idle;
    };
    if snapshot.display_enabled == Some(false) {
        return DisplayMode::Idle;
    }
    if snapshot.houses.is_empty() {
        return DisplayMode::Idle;
    }

    DisplayMode::Normal
}

/// Late-night variant of the idle screen (cosmetic only).
pub fn is_late_night(hour: u32) -> bool {
    hour >= 22 || hour < 5
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
