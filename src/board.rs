// Board data model and normalization.
//
// A `BoardSnapshot` is one fetched, validated unit of board data. The fetch
// client builds a raw snapshot from the wire JSON and calls `normalize()`,
// which applies the display ordering rules: standings sorted by points,
// recent events bounded to the newest three, contributors aggregated into a
// top-five list.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Maximum number of recent events kept after normalization.
pub const RECENT_EVENTS_LIMIT: usize = 3;

/// Maximum number of contributors kept after aggregation.
pub const TOP_CONTRIBUTORS_LIMIT: usize = 5;

/// Event timestamps are recorded by the sheet in US Eastern (UTC-5).
const EST_OFFSET_SECS: i32 = 5 * 3600;

// ---------------------------------------------------------------------------
// Model types
// ---------------------------------------------------------------------------

/// One house row on the standings board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct House {
    pub name: String,
    pub points: i64,
    /// Hex color string used for the house's row background.
    pub color: String,
}

/// One recent points-award event (wire field `lastInputs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEvent {
    /// Raw timestamp string, `DD/MM/YYYY HH:mm:ss` in EST.
    pub timestamp: String,
    pub house: String,
    pub points: i64,
}

/// One aggregated contributor row (wire field `email`, but any label works).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub label: String,
    pub points: i64,
}

/// One fetched, validated unit of board data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSnapshot {
    /// Standings, sorted descending by points after normalization.
    pub houses: Vec<House>,
    /// Newest-first, bounded to `RECENT_EVENTS_LIMIT` after normalization.
    pub recent_events: Vec<RecentEvent>,
    /// Aggregated and bounded to `TOP_CONTRIBUTORS_LIMIT` after normalization.
    pub top_contributors: Vec<Contributor>,
    /// Free-form announcement shown verbatim when present.
    pub message: Option<String>,
    /// Explicit override from the sheet to suppress the board.
    pub display_enabled: Option<bool>,
    /// Optional page background color from the sheet.
    pub background_color: Option<String>,
}

impl BoardSnapshot {
    /// A snapshot is only usable when it carries at least one house; an
    /// empty snapshot must never replace held state.
    pub fn is_valid(&self) -> bool {
        !self.houses.is_empty()
    }

    /// Total points awarded across all houses.
    pub fn total_points(&self) -> i64 {
        self.houses.iter().map(|h| h.points).sum()
    }

    /// Apply the display ordering rules in place.
    ///
    /// Idempotent: normalizing an already-normalized snapshot is a no-op.
    pub fn normalize(&mut self) {
        // Stable sort keeps the incoming order for ties.
        self.houses.sort_by(|a, b| b.points.cmp(&a.points));

        self.recent_events = bound_recent_events(std::mem::take(&mut self.recent_events));
        self.top_contributors = aggregate_contributors(std::mem::take(&mut self.top_contributors));
    }
}

// ---------------------------------------------------------------------------
// Normalization rules
// ---------------------------------------------------------------------------

/// Keep the last `RECENT_EVENTS_LIMIT` rows of input order, newest first.
///
/// The sheet appends rows chronologically, so the tail of the input is the
/// newest activity. Reapplying to an already-bounded newest-first list
/// returns it unchanged only when the list is within the limit, which holds
/// for every normalized snapshot.
pub fn bound_recent_events(mut events: Vec<RecentEvent>) -> Vec<RecentEvent> {
    if events.len() > RECENT_EVENTS_LIMIT {
        events.drain(..events.len() - RECENT_EVENTS_LIMIT);
        events.reverse();
    } else if !is_newest_first(&events) {
        events.reverse();
    }
    events
}

/// Rows already normalized are newest first; raw sheet rows are oldest first.
/// Within the bound we only need to know whether to flip.
fn is_newest_first(events: &[RecentEvent]) -> bool {
    let parsed: Vec<_> = events
        .iter()
        .filter_map(|e| parse_event_timestamp(&e.timestamp))
        .collect();
    if parsed.len() < 2 {
        return true;
    }
    parsed.windows(2).all(|w| w[0] >= w[1])
}

/// Sum points per label, sort descending, truncate to the top five.
///
/// First-seen order is preserved for ties (stable sort over insertion order).
pub fn aggregate_contributors(raw: Vec<Contributor>) -> Vec<Contributor> {
    let mut aggregated: Vec<Contributor> = Vec::new();
    for row in raw {
        match aggregated.iter_mut().find(|c| c.label == row.label) {
            Some(existing) => existing.points += row.points,
            None => aggregated.push(row),
        }
    }
    aggregated.sort_by(|a, b| b.points.cmp(&a.points));
    aggregated.truncate(TOP_CONTRIBUTORS_LIMIT);
    aggregated
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current time in the sheet's zone, for elapsed-time display.
pub fn est_now() -> DateTime<FixedOffset> {
    match FixedOffset::west_opt(EST_OFFSET_SECS) {
        Some(est) => Utc::now().with_timezone(&est),
        None => Utc::now().fixed_offset(),
    }
}

/// Parse a sheet timestamp (`DD/MM/YYYY HH:mm:ss`, EST) into a zoned time.
///
/// Returns `None` for malformed input; callers fall back to showing the raw
/// string.
pub fn parse_event_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let est = FixedOffset::west_opt(EST_OFFSET_SECS)?;
    let naive = NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M:%S").ok()?;
    est.from_local_datetime(&naive).single()
}

/// Human-readable elapsed time for an event timestamp, relative to `now`.
///
/// "just now" / "N minutes ago" / "N hours ago" / "yesterday" /
/// "N days ago", then a short date for anything older than a week.
pub fn format_time_ago(raw: &str, now: DateTime<FixedOffset>) -> String {
    let Some(then) = parse_event_timestamp(raw) else {
        return raw.to_string();
    };

    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes == 1 {
        return "1 minute ago".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} minutes ago");
    }

    let hours = minutes / 60;
    if hours == 1 {
        return "1 hour ago".to_string();
    }
    if hours < 24 {
        return format!("{hours} hours ago");
    }

    let days = hours / 24;
    if days == 1 {
        return "yesterday".to_string();
    }
    if days < 7 {
        return format!("{days} days ago");
    }

    if then.year() == now.year() {
        then.format("%b %-d").to_string()
    } else {
        then.format("%b %-d, %Y").to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
