// Polling driver: the central event loop that owns the refresh schedule,
// the fetch client, and the cross-instance coordinator.
//
// Fetches run in spawned tasks so a slow endpoint never stalls the loop;
// their results come back over an mpsc channel tagged with a generation
// counter, and stale results from superseded fetches are discarded. A 1s
// housekeeping tick drives the countdown, the lease heartbeat, and the
// poll deadline, so there is exactly one timer regardless of how often the
// board flips between active and quiet.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveTime, Timelike, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::board::BoardSnapshot;
use crate::display::{compute_mode, is_late_night, ManualOverride};
use crate::fetch::BoardClient;
use crate::priority::{PriorityCoordinator, HEARTBEAT_INTERVAL, RECHECK_INTERVAL};
use crate::protocol::{BoardStatus, FetchEvent, UiUpdate, UserCommand};
use crate::schedule::{PollOutcome, Schedule};

/// Cadence of the housekeeping tick.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// DriverState
// ---------------------------------------------------------------------------

/// The complete driver state.
pub struct DriverState {
    pub schedule: Schedule,
    pub coordinator: PriorityCoordinator,
    pub snapshot: Option<BoardSnapshot>,
    pub manual_override: ManualOverride,
    pub last_error: Option<String>,
    pub fetching: bool,
    /// Monotonically increasing counter identifying the in-flight fetch.
    /// Incremented each time a fetch is spawned; results from older
    /// generations are discarded in `apply_fetch_event`.
    pub fetch_generation: u64,
    /// Set when a due poll was deferred because another instance holds
    /// priority. Cleared on the next permitted fetch.
    pub blocked: bool,
    client: Arc<BoardClient>,
    current_fetch_task: Option<tokio::task::JoinHandle<()>>,
    /// Deadline for the next poll. The countdown shown in the status line
    /// derives from this single value.
    next_refresh_at: Option<Instant>,
    last_heartbeat: Option<Instant>,
    /// Sender for fetch results; spawned tasks use a clone.
    fetch_tx: mpsc::Sender<FetchEvent>,
}

impl DriverState {
    pub fn new(
        schedule: Schedule,
        client: BoardClient,
        coordinator: PriorityCoordinator,
        fetch_tx: mpsc::Sender<FetchEvent>,
    ) -> Self {
        DriverState {
            schedule,
            coordinator,
            snapshot: None,
            manual_override: ManualOverride::Auto,
            last_error: None,
            fetching: false,
            fetch_generation: 0,
            blocked: false,
            client: Arc::new(client),
            current_fetch_task: None,
            next_refresh_at: None,
            last_heartbeat: None,
            fetch_tx,
        }
    }

    /// Build the status snapshot pushed to the TUI.
    pub fn status(&self, now: NaiveTime, now_ms: i64) -> BoardStatus {
        let quiet = self.schedule.is_quiet(now);
        BoardStatus {
            mode: compute_mode(self.snapshot.as_ref(), quiet, self.manual_override),
            quiet,
            manual_override: self.manual_override,
            next_refresh_secs: if self.fetching {
                None
            } else {
                // Round up so the countdown reads "30" right after a poll,
                // not "29".
                self.next_refresh_at.map(|at| {
                    let left = at.saturating_duration_since(Instant::now());
                    left.as_secs() + u64::from(left.subsec_nanos() > 0)
                })
            },
            fetching: self.fetching,
            block_reason: self.coordinator.block_reason(now_ms),
            priority_holder: self.coordinator.is_holder(),
            late_night: is_late_night(now.hour()),
        }
    }

    /// Spawn a fetch task unless one is already in flight.
    pub fn start_fetch(&mut self, now_ms: i64) {
        if self.fetching {
            debug!("fetch already in flight, skipping");
            return;
        }
        self.fetch_generation += 1;
        let generation = self.fetch_generation;
        self.fetching = true;
        self.blocked = false;
        self.next_refresh_at = None;

        let client = Arc::clone(&self.client);
        let tx = self.fetch_tx.clone();
        let handle = tokio::spawn(async move {
            let event = match client.fetch(now_ms).await {
                Ok(snapshot) => FetchEvent::Fetched {
                    snapshot,
                    generation,
                },
                Err(err) => FetchEvent::Failed {
                    message: err.to_string(),
                    generation,
                },
            };
            let _ = tx.send(event).await;
        });
        self.current_fetch_task = Some(handle);
        debug!(generation, "fetch started");
    }

    pub fn cancel_fetch_task(&mut self) {
        if let Some(handle) = self.current_fetch_task.take() {
            handle.abort();
        }
        self.fetching = false;
    }

    /// Apply a completed fetch and schedule the next poll.
    pub fn apply_fetch_event(
        &mut self,
        event: FetchEvent,
        now: NaiveTime,
        now_ms: i64,
    ) -> Vec<UiUpdate> {
        let generation = match &event {
            FetchEvent::Fetched { generation, .. } => *generation,
            FetchEvent::Failed { generation, .. } => *generation,
        };
        if generation != self.fetch_generation {
            debug!(
                generation,
                current = self.fetch_generation,
                "discarding stale fetch result"
            );
            return Vec::new();
        }

        self.fetching = false;
        self.current_fetch_task = None;

        let mut updates = Vec::new();
        let outcome = match event {
            FetchEvent::Fetched { snapshot, .. } => {
                if snapshot.is_valid() {
                    info!(
                        houses = snapshot.houses.len(),
                        total = snapshot.total_points(),
                        "board updated"
                    );
                    self.last_error = None;
                    self.snapshot = Some(snapshot.clone());
                    updates.push(UiUpdate::Snapshot(Box::new(snapshot)));
                    PollOutcome::Success
                } else {
                    // An empty board never replaces held state.
                    warn!("endpoint returned a board with no houses");
                    let message = "endpoint returned a board with no houses".to_string();
                    self.last_error = Some(message.clone());
                    updates.push(UiUpdate::FetchFailed(message));
                    PollOutcome::Failure
                }
            }
            FetchEvent::Failed { message, .. } => {
                warn!(%message, "fetch failed");
                self.last_error = Some(message.clone());
                updates.push(UiUpdate::FetchFailed(message));
                PollOutcome::Failure
            }
        };

        let delay = self
            .schedule
            .delay_after(now, outcome, self.manual_override);
        self.next_refresh_at = Some(Instant::now() + delay);
        updates.push(UiUpdate::Status(Box::new(self.status(now, now_ms))));
        updates
    }

    /// Handle a command from the TUI.
    pub fn handle_command(
        &mut self,
        cmd: UserCommand,
        now: NaiveTime,
        now_ms: i64,
    ) -> Vec<UiUpdate> {
        match cmd {
            UserCommand::ForceRefresh => {
                if self.coordinator.can_fetch(now_ms) {
                    info!("manual refresh requested");
                    self.start_fetch(now_ms);
                } else {
                    debug!("manual refresh ignored: another instance holds priority");
                    self.blocked = true;
                }
            }
            UserCommand::CycleOverride => {
                self.manual_override = self.manual_override.next();
                info!(mode = self.manual_override.label(), "display override cycled");
                // The old countdown may belong to the wrong regime (a 1h
                // quiet recheck while forced on, or vice versa), so rebuild
                // the deadline from the new override.
                if !self.fetching {
                    if self.manual_override == ManualOverride::ForcedOn {
                        // Forcing the display on refreshes right away.
                        if self.coordinator.can_fetch(now_ms) {
                            self.start_fetch(now_ms);
                        } else {
                            self.blocked = true;
                            self.next_refresh_at = Some(Instant::now() + RECHECK_INTERVAL);
                        }
                    } else {
                        let delay = self.schedule.delay_after(
                            now,
                            PollOutcome::Success,
                            self.manual_override,
                        );
                        self.next_refresh_at = Some(Instant::now() + delay);
                    }
                }
            }
            UserCommand::ActivatePriority { key } => {
                if self.coordinator.activate_with_key(&key, now_ms) {
                    info!("priority mode activated");
                    self.last_heartbeat = Some(Instant::now());
                }
            }
            UserCommand::ReleasePriority => {
                self.coordinator.release();
            }
            UserCommand::Quit => {}
        }
        vec![UiUpdate::Status(Box::new(self.status(now, now_ms)))]
    }

    /// One housekeeping tick: heartbeat, poll deadline, status push.
    pub fn tick(&mut self, now: NaiveTime, now_ms: i64) -> Vec<UiUpdate> {
        if self.coordinator.is_holder() {
            let due = self
                .last_heartbeat
                .is_none_or(|at| at.elapsed() >= HEARTBEAT_INTERVAL);
            if due {
                self.coordinator.heartbeat(now_ms);
                self.last_heartbeat = Some(Instant::now());
            }
        }

        if !self.fetching {
            let due = self
                .next_refresh_at
                .is_some_and(|at| at <= Instant::now());
            if due {
                if self.coordinator.can_fetch(now_ms) {
                    self.start_fetch(now_ms);
                } else {
                    self.blocked = true;
                    self.next_refresh_at = Some(Instant::now() + RECHECK_INTERVAL);
                }
            }
        }

        vec![UiUpdate::Status(Box::new(self.status(now, now_ms)))]
    }

    /// React to a change in the shared lease directory. If a due poll was
    /// deferred and the lease is now clear, fetch immediately instead of
    /// waiting out the recheck interval.
    pub fn lease_changed(&mut self, now: NaiveTime, now_ms: i64) -> Vec<UiUpdate> {
        if self.blocked && !self.fetching && self.coordinator.can_fetch(now_ms) {
            info!("priority lease cleared, resuming polls");
            self.start_fetch(now_ms);
        }
        vec![UiUpdate::Status(Box::new(self.status(now, now_ms)))]
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

fn now_time() -> NaiveTime {
    Local::now().time()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Run the driver event loop.
///
/// Listens with `tokio::select!` on fetch results, user commands, lease
/// directory notifications, and the housekeeping tick. Pushes `UiUpdate`s
/// through `ui_tx` for the TUI render loop.
pub async fn run(
    mut fetch_rx: mpsc::Receiver<FetchEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: DriverState,
) -> anyhow::Result<()> {
    info!("board driver started");

    // The watcher handle must stay alive for notifications to flow. When
    // no watcher is available the periodic recheck in tick() still
    // notices lease changes, just more slowly.
    let watch = state.coordinator.watch();
    let (_watcher, mut watch_rx, mut watch_open) = match watch {
        Some((watcher, rx)) => (Some(watcher), rx, true),
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (None, rx, false)
        }
    };

    // First poll fires immediately (or defers if another instance holds
    // priority).
    if state.coordinator.can_fetch(now_ms()) {
        state.start_fetch(now_ms());
    } else {
        state.blocked = true;
        state.next_refresh_at = Some(Instant::now() + RECHECK_INTERVAL);
    }

    let mut tick = tokio::time::interval(TICK_INTERVAL);
    // The first tick completes immediately; consume it.
    tick.tick().await;

    loop {
        let updates = tokio::select! {
            event = fetch_rx.recv() => {
                match event {
                    Some(event) => state.apply_fetch_event(event, now_time(), now_ms()),
                    None => {
                        info!("fetch channel closed, shutting down");
                        break;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => state.handle_command(cmd, now_time(), now_ms()),
                    None => {
                        info!("command channel closed, shutting down");
                        break;
                    }
                }
            }

            change = watch_rx.recv(), if watch_open => {
                match change {
                    Some(()) => state.lease_changed(now_time(), now_ms()),
                    None => {
                        // Watcher gone; the periodic recheck covers us.
                        watch_open = false;
                        Vec::new()
                    }
                }
            }

            _ = tick.tick() => state.tick(now_time(), now_ms()),
        };

        for update in updates {
            if ui_tx.send(update).await.is_err() {
                // TUI gone; nothing left to drive.
                info!("ui channel closed, shutting down");
                state.cancel_fetch_task();
                state.coordinator.release();
                return Ok(());
            }
        }
    }

    // Cleanup: abort any in-flight fetch and give up a held lease so other
    // instances resume promptly.
    state.cancel_fetch_task();
    state.coordinator.release();
    info!("board driver exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
