// Refresh scheduling: when the next poll should fire.
//
// All decisions are pure functions over a `NaiveTime` supplied by the
// caller, so the driver owns "now" and the tests never need a clock.

use std::time::Duration;

use chrono::NaiveTime;

use crate::config::ScheduleConfig;
use crate::display::ManualOverride;

/// Quiet-window recheck tiers. Far from the window's end we sleep long;
/// as it approaches we tighten so the board wakes within a minute of it.
const QUIET_RECHECK_COARSE: Duration = Duration::from_secs(60 * 60);
const QUIET_RECHECK_MEDIUM: Duration = Duration::from_secs(5 * 60);
const QUIET_RECHECK_FINE: Duration = Duration::from_secs(60);

const QUIET_COARSE_THRESHOLD_MINS: i64 = 60;
const QUIET_MEDIUM_THRESHOLD_MINS: i64 = 5;

/// Outcome of the most recent fetch attempt, as far as scheduling cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Success,
    Failure,
}

/// Polling cadence and the daily quiet window.
#[derive(Debug, Clone)]
pub struct Schedule {
    quiet_start: NaiveTime,
    quiet_end: NaiveTime,
    poll_interval: Duration,
    retry_delay: Duration,
}

impl Schedule {
    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self {
            quiet_start: config.quiet_start,
            quiet_end: config.quiet_end,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Whether `now` falls inside the quiet window.
    ///
    /// The window is half-open: the start minute is quiet, the end minute is
    /// active. A window whose start is later in the day than its end wraps
    /// past midnight.
    pub fn is_quiet(&self, now: NaiveTime) -> bool {
        if self.quiet_start <= self.quiet_end {
            now >= self.quiet_start && now < self.quiet_end
        } else {
            now >= self.quiet_start || now < self.quiet_end
        }
    }

    /// Whole minutes from `now` until the quiet window closes, assuming
    /// `now` is inside the window.
    fn minutes_until_quiet_end(&self, now: NaiveTime) -> i64 {
        let mut secs = (self.quiet_end - now).num_seconds();
        if secs <= 0 {
            secs += 24 * 60 * 60;
        }
        secs / 60
    }

    /// How long to sleep before rechecking the quiet window.
    pub fn quiet_recheck_delay(&self, now: NaiveTime) -> Duration {
        let mins = self.minutes_until_quiet_end(now);
        if mins > QUIET_COARSE_THRESHOLD_MINS {
            QUIET_RECHECK_COARSE
        } else if mins > QUIET_MEDIUM_THRESHOLD_MINS {
            QUIET_RECHECK_MEDIUM
        } else {
            QUIET_RECHECK_FINE
        }
    }

    /// Delay until the next poll, given the outcome of the one that just
    /// finished. A forced-on override keeps the active cadence regardless
    /// of the quiet window.
    pub fn delay_after(
        &self,
        now: NaiveTime,
        outcome: PollOutcome,
        manual_override: ManualOverride,
    ) -> Duration {
        if manual_override != ManualOverride::ForcedOn && self.is_quiet(now) {
            return self.quiet_recheck_delay(now);
        }
        match outcome {
            PollOutcome::Success => self.poll_interval,
            PollOutcome::Failure => self.retry_delay,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule::from_config(&ScheduleConfig {
            poll_interval_secs: 30,
            retry_delay_secs: 3,
            quiet_start: NaiveTime::from_hms_opt(16, 30, 0).unwrap(),
            quiet_end: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
        })
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn quiet_window_wraps_past_midnight() {
        let sched = schedule();
        assert!(sched.is_quiet(at(16, 30, 0)));
        assert!(sched.is_quiet(at(23, 59, 59)));
        assert!(sched.is_quiet(at(0, 0, 0)));
        assert!(sched.is_quiet(at(7, 29, 59)));
        assert!(!sched.is_quiet(at(7, 30, 0)));
        assert!(!sched.is_quiet(at(12, 0, 0)));
        assert!(!sched.is_quiet(at(16, 29, 59)));
    }

    #[test]
    fn quiet_window_without_wrap() {
        let sched = Schedule::from_config(&ScheduleConfig {
            poll_interval_secs: 30,
            retry_delay_secs: 3,
            quiet_start: at(12, 0, 0),
            quiet_end: at(14, 0, 0),
        });
        assert!(!sched.is_quiet(at(11, 59, 59)));
        assert!(sched.is_quiet(at(12, 0, 0)));
        assert!(sched.is_quiet(at(13, 59, 59)));
        assert!(!sched.is_quiet(at(14, 0, 0)));
        assert!(!sched.is_quiet(at(23, 0, 0)));
    }

    #[test]
    fn recheck_is_coarse_far_from_window_end() {
        let sched = schedule();
        // 20:00 -> 11.5 hours until 07:30.
        assert_eq!(
            sched.quiet_recheck_delay(at(20, 0, 0)),
            Duration::from_secs(3600)
        );
        // 06:29 -> 61 minutes out, still coarse.
        assert_eq!(
            sched.quiet_recheck_delay(at(6, 29, 0)),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn recheck_tightens_near_window_end() {
        let sched = schedule();
        // 06:30 -> exactly 60 minutes, drops to the medium tier.
        assert_eq!(
            sched.quiet_recheck_delay(at(6, 30, 0)),
            Duration::from_secs(300)
        );
        assert_eq!(
            sched.quiet_recheck_delay(at(6, 45, 0)),
            Duration::from_secs(300)
        );
        // 07:25 -> exactly 5 minutes, drops to the fine tier.
        assert_eq!(
            sched.quiet_recheck_delay(at(7, 25, 0)),
            Duration::from_secs(60)
        );
        assert_eq!(
            sched.quiet_recheck_delay(at(7, 29, 30)),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn active_delays_follow_outcome() {
        let sched = schedule();
        let noon = at(12, 0, 0);
        assert_eq!(
            sched.delay_after(noon, PollOutcome::Success, ManualOverride::Auto),
            Duration::from_secs(30)
        );
        assert_eq!(
            sched.delay_after(noon, PollOutcome::Failure, ManualOverride::Auto),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn quiet_delay_ignores_outcome() {
        let sched = schedule();
        let evening = at(20, 0, 0);
        assert_eq!(
            sched.delay_after(evening, PollOutcome::Success, ManualOverride::Auto),
            Duration::from_secs(3600)
        );
        assert_eq!(
            sched.delay_after(evening, PollOutcome::Failure, ManualOverride::Auto),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn forced_on_keeps_active_cadence_during_quiet_window() {
        let sched = schedule();
        let evening = at(20, 0, 0);
        assert_eq!(
            sched.delay_after(evening, PollOutcome::Success, ManualOverride::ForcedOn),
            Duration::from_secs(30)
        );
        assert_eq!(
            sched.delay_after(evening, PollOutcome::Failure, ManualOverride::ForcedOn),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn forced_off_does_not_change_polling_cadence() {
        // Forced-off hides the board but polling still honors the window.
        let sched = schedule();
        assert_eq!(
            sched.delay_after(at(12, 0, 0), PollOutcome::Success, ManualOverride::ForcedOff),
            Duration::from_secs(30)
        );
        assert_eq!(
            sched.delay_after(at(20, 0, 0), PollOutcome::Success, ManualOverride::ForcedOff),
            Duration::from_secs(3600)
        );
    }
}
