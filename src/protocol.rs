// Message types exchanged between the driver, fetch tasks, and the TUI.

use crate::board::BoardSnapshot;
use crate::display::{DisplayMode, ManualOverride};

/// Result of a spawned fetch task.
///
/// Every event carries the generation counter of the task that produced it
/// so the driver can discard results from superseded fetches.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    Fetched {
        snapshot: BoardSnapshot,
        generation: u64,
    },
    Failed {
        message: String,
        generation: u64,
    },
}

/// Commands from the TUI to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Poll the endpoint now, regardless of the countdown.
    ForceRefresh,
    /// Cycle the manual display override (auto / forced on / forced off).
    CycleOverride,
    /// Claim priority with an activation key.
    ActivatePriority { key: String },
    /// Give up a held priority lease.
    ReleasePriority,
    Quit,
}

/// Driver status pushed to the TUI on every housekeeping tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardStatus {
    pub mode: DisplayMode,
    pub quiet: bool,
    pub manual_override: ManualOverride,
    /// Seconds until the next poll. `None` while a fetch is in flight.
    pub next_refresh_secs: Option<u64>,
    pub fetching: bool,
    /// Why fetching is suspended, when another instance holds priority.
    pub block_reason: Option<String>,
    pub priority_holder: bool,
    pub late_night: bool,
}

impl Default for BoardStatus {
    fn default() -> Self {
        BoardStatus {
            mode: DisplayMode::Idle,
            quiet: false,
            manual_override: ManualOverride::Auto,
            next_refresh_secs: None,
            fetching: false,
            block_reason: None,
            priority_holder: false,
            late_night: false,
        }
    }
}

/// Updates pushed from the driver to the TUI render loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// A fresh, valid snapshot replacing the held one.
    Snapshot(Box<BoardSnapshot>),
    /// A poll failed; the TUI keeps rendering the held snapshot alongside
    /// the error.
    FetchFailed(String),
    Status(Box<BoardStatus>),
}
