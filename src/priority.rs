// Cross-instance fetch coordination.
//
// When several kiosks point at the same endpoint, one instance can be
// granted priority: it takes a lease in a shared directory and heartbeats
// it, and every other instance suspends fetching while the lease looks
// alive. A lease whose heartbeat is older than the liveness window is
// treated as abandoned and removed by whichever instance notices first.
//
// The lease is a single JSON file written atomically (temp file + rename)
// so readers never observe a partial write.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CoordinationConfig;

/// How often a priority holder refreshes its lease.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// A lease with a heartbeat older than this is considered abandoned.
pub const LIVENESS_WINDOW_MS: i64 = 10_000;

/// Blocked instances recheck the lease on this cadence even if no
/// filesystem notification arrives.
pub const RECHECK_INTERVAL: Duration = Duration::from_secs(5);

const LEASE_FILE: &str = "priority.json";

/// Serialized lease contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Lease {
    holder: String,
    /// When the lease was claimed. Preserved across heartbeats.
    granted_at_ms: i64,
    heartbeat_ms: i64,
}

// ---------------------------------------------------------------------------
// PriorityCoordinator
// ---------------------------------------------------------------------------

/// High-level wrapper that is either coordinating through a lease directory
/// or disabled (no usable directory; every fetch is permitted).
pub enum PriorityCoordinator {
    Active(LeaseCoordinator),
    Disabled,
}

impl PriorityCoordinator {
    /// Build a coordinator from config. Falls back to `Disabled` when no
    /// lease directory can be prepared; the board must keep working on a
    /// kiosk without a writable runtime directory.
    pub fn from_config(config: &CoordinationConfig) -> Self {
        let dir = match &config.lease_dir {
            Some(dir) => dir.clone(),
            None => match default_lease_dir() {
                Some(dir) => dir,
                None => {
                    warn!("no runtime directory available; coordination disabled");
                    return PriorityCoordinator::Disabled;
                }
            },
        };
        match LeaseCoordinator::new(dir, config.secret_key.clone()) {
            Ok(inner) => {
                info!(lease_dir = %inner.lease_dir().display(), "coordination active");
                PriorityCoordinator::Active(inner)
            }
            Err(err) => {
                warn!(?err, "failed to prepare lease directory; coordination disabled");
                PriorityCoordinator::Disabled
            }
        }
    }

    /// Whether this instance currently holds the priority lease.
    pub fn is_holder(&self) -> bool {
        match self {
            PriorityCoordinator::Active(inner) => inner.is_holder(),
            PriorityCoordinator::Disabled => false,
        }
    }

    /// Whether this instance may fetch right now. Stale leases are cleaned
    /// up as a side effect.
    pub fn can_fetch(&self, now_ms: i64) -> bool {
        match self {
            PriorityCoordinator::Active(inner) => inner.can_fetch(now_ms),
            PriorityCoordinator::Disabled => true,
        }
    }

    /// Status-line text shown while fetching is suspended.
    pub fn block_reason(&self, now_ms: i64) -> Option<String> {
        match self {
            PriorityCoordinator::Active(inner) => inner.block_reason(now_ms),
            PriorityCoordinator::Disabled => None,
        }
    }

    /// Claim priority if `key` matches the configured activation key.
    /// Returns whether priority was granted.
    pub fn activate_with_key(&mut self, key: &str, now_ms: i64) -> bool {
        match self {
            PriorityCoordinator::Active(inner) => inner.activate_with_key(key, now_ms),
            PriorityCoordinator::Disabled => {
                warn!("priority activation ignored; coordination disabled");
                false
            }
        }
    }

    /// Refresh the lease heartbeat. No-op unless this instance holds it.
    pub fn heartbeat(&self, now_ms: i64) {
        if let PriorityCoordinator::Active(inner) = self {
            inner.heartbeat(now_ms);
        }
    }

    /// Release the lease if held. Called on shutdown and on manual release.
    pub fn release(&mut self) {
        if let PriorityCoordinator::Active(inner) = self {
            inner.release();
        }
    }

    /// Watch the lease directory for changes made by other instances.
    ///
    /// Returns the watcher (which must be kept alive) and a channel that
    /// fires on any change. Best-effort: `None` when the platform watcher
    /// cannot be set up, in which case the periodic recheck still covers us.
    pub fn watch(&self) -> Option<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
        match self {
            PriorityCoordinator::Active(inner) => inner.watch(),
            PriorityCoordinator::Disabled => None,
        }
    }
}

// ---------------------------------------------------------------------------
// LeaseCoordinator
// ---------------------------------------------------------------------------

/// The real coordinator, bound to a shared lease directory.
pub struct LeaseCoordinator {
    instance_id: String,
    lease_dir: PathBuf,
    secret_key: String,
    holding: bool,
    granted_at_ms: i64,
}

impl LeaseCoordinator {
    pub fn new(lease_dir: PathBuf, secret_key: String) -> anyhow::Result<Self> {
        fs::create_dir_all(&lease_dir)
            .with_context(|| format!("failed to create lease dir {}", lease_dir.display()))?;
        Ok(Self {
            instance_id: Uuid::new_v4().to_string(),
            lease_dir,
            secret_key,
            holding: false,
            granted_at_ms: 0,
        })
    }

    pub fn lease_dir(&self) -> &Path {
        &self.lease_dir
    }

    pub fn is_holder(&self) -> bool {
        self.holding
    }

    fn lease_path(&self) -> PathBuf {
        self.lease_dir.join(LEASE_FILE)
    }

    /// Read the current lease. Unreadable or corrupt files count as no
    /// lease; coordination must never wedge the board.
    fn read_lease(&self) -> Option<Lease> {
        let raw = fs::read_to_string(self.lease_path()).ok()?;
        match serde_json::from_str(&raw) {
            Ok(lease) => Some(lease),
            Err(err) => {
                warn!(?err, "ignoring corrupt lease file");
                None
            }
        }
    }

    fn write_lease(&self, lease: &Lease) {
        let path = self.lease_path();
        let tmp = self.lease_dir.join(format!(".{LEASE_FILE}.{}", self.instance_id));
        let write = || -> anyhow::Result<()> {
            let body = serde_json::to_string(lease)?;
            fs::write(&tmp, body)?;
            fs::rename(&tmp, &path)?;
            Ok(())
        };
        if let Err(err) = write() {
            warn!(?err, "failed to write lease file");
            let _ = fs::remove_file(&tmp);
        }
    }

    fn remove_lease(&self) {
        if let Err(err) = fs::remove_file(self.lease_path()) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(?err, "failed to remove lease file");
            }
        }
    }

    pub fn activate_with_key(&mut self, key: &str, now_ms: i64) -> bool {
        if key != self.secret_key {
            warn!("priority activation rejected: bad key");
            return false;
        }
        self.claim(now_ms);
        true
    }

    /// Take the lease unconditionally. The newest activation wins; an
    /// operator entering the key supersedes whoever held it before.
    pub fn claim(&mut self, now_ms: i64) {
        self.granted_at_ms = now_ms;
        self.write_lease(&Lease {
            holder: self.instance_id.clone(),
            granted_at_ms: now_ms,
            heartbeat_ms: now_ms,
        });
        self.holding = true;
        info!(instance = %self.instance_id, "priority lease claimed");
    }

    pub fn release(&mut self) {
        if !self.holding {
            return;
        }
        // Only remove the file if we still own it; another instance may
        // have superseded us.
        if let Some(lease) = self.read_lease() {
            if lease.holder == self.instance_id {
                self.remove_lease();
            }
        }
        self.holding = false;
        info!(instance = %self.instance_id, "priority lease released");
    }

    pub fn heartbeat(&self, now_ms: i64) {
        if !self.holding {
            return;
        }
        self.write_lease(&Lease {
            holder: self.instance_id.clone(),
            granted_at_ms: self.granted_at_ms,
            heartbeat_ms: now_ms,
        });
    }

    fn lease_age_ms(lease: &Lease, now_ms: i64) -> i64 {
        now_ms.saturating_sub(lease.heartbeat_ms)
    }

    pub fn can_fetch(&self, now_ms: i64) -> bool {
        let Some(lease) = self.read_lease() else {
            return true;
        };
        if lease.holder == self.instance_id {
            return true;
        }
        if Self::lease_age_ms(&lease, now_ms) > LIVENESS_WINDOW_MS {
            // Abandoned lease: whoever notices cleans it up.
            debug!(holder = %lease.holder, "clearing stale priority lease");
            self.remove_lease();
            return true;
        }
        false
    }

    pub fn block_reason(&self, now_ms: i64) -> Option<String> {
        let lease = self.read_lease()?;
        if lease.holder == self.instance_id {
            return None;
        }
        if Self::lease_age_ms(&lease, now_ms) > LIVENESS_WINDOW_MS {
            return None;
        }
        let held_ms = now_ms.saturating_sub(lease.granted_at_ms);
        Some(format!(
            "refresh paused: priority display active (granted {}s ago)",
            held_ms / 1000
        ))
    }

    pub fn watch(&self) -> Option<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = match notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| {
                if res.is_ok() {
                    let _ = tx.send(());
                }
            },
        ) {
            Ok(w) => w,
            Err(err) => {
                warn!(?err, "lease watcher unavailable; relying on periodic recheck");
                return None;
            }
        };
        if let Err(err) = watcher.watch(&self.lease_dir, RecursiveMode::NonRecursive) {
            warn!(?err, "failed to watch lease dir; relying on periodic recheck");
            return None;
        }
        Some((watcher, rx))
    }
}

/// Per-user runtime directory for the lease, shared by every instance the
/// same user starts.
fn default_lease_dir() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("org", "hillboard", "hillboard")?;
    let base = dirs
        .runtime_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dirs.cache_dir().to_path_buf());
    Some(base.join("leases"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
