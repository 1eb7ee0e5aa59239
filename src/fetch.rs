// Board endpoint client.
//
// One GET per poll, with a millisecond cache-buster query parameter and
// no-cache headers so intermediate proxies never serve a stale board. The
// wire JSON is validated strictly for `houses` (a bad standings payload is
// a failed poll) and leniently for everything else (malformed activity or
// contributor rows are dropped, not fatal).

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::board::{BoardSnapshot, Contributor, House, RecentEvent};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to board endpoint failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("board endpoint returned status {status}")]
    Http { status: reqwest::StatusCode },

    #[error("invalid board payload: {0}")]
    InvalidShape(String),

    #[error("endpoint returned a board with no houses")]
    EmptyBoard,
}

/// HTTP client for the board data endpoint.
pub struct BoardClient {
    http: reqwest::Client,
    url: String,
}

impl BoardClient {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }

    /// Fetch and parse one board snapshot.
    ///
    /// `cache_buster` is appended as a `t` query parameter; callers pass the
    /// current wall-clock millis so every request has a distinct URL.
    pub async fn fetch(&self, cache_buster: i64) -> Result<BoardSnapshot, FetchError> {
        debug!(url = %self.url, cache_buster, "fetching board data");

        let response = self
            .http
            .get(&self.url)
            .query(&[("t", cache_buster)])
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http { status });
        }

        let body: Value = response.json().await?;

        parse_snapshot(&body)
    }
}

// ---------------------------------------------------------------------------
// Wire JSON parsing
// ---------------------------------------------------------------------------

/// Build a normalized snapshot from the wire JSON.
///
/// `houses` must be an array of well-formed rows or the whole payload is
/// rejected; `lastInputs` and `topContributors` are coerced best-effort.
pub(crate) fn parse_snapshot(body: &Value) -> Result<BoardSnapshot, FetchError> {
    let houses = parse_houses(body.get("houses"))?;
    if houses.is_empty() {
        return Err(FetchError::EmptyBoard);
    }

    let recent_events = body
        .get("lastInputs")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(coerce_event).collect())
        .unwrap_or_default();

    let top_contributors = body
        .get("topContributors")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(coerce_contributor).collect())
        .unwrap_or_default();

    let mut snapshot = BoardSnapshot {
        houses,
        recent_events,
        top_contributors,
        message: body
            .get("message")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
        display_enabled: body
            .get("displayEnabled")
            .or_else(|| body.get("showBoard"))
            .and_then(Value::as_bool),
        background_color: body
            .get("backgroundColor")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    snapshot.normalize();
    Ok(snapshot)
}

/// Strict standings validation. Every row must carry a non-empty name and a
/// numeric points value.
fn parse_houses(value: Option<&Value>) -> Result<Vec<House>, FetchError> {
    let rows = value
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::InvalidShape("payload is missing the houses array".into()))?;

    let mut houses = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let name = row
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| FetchError::InvalidShape(format!("house row {index} has no name")))?;
        let points = coerce_points(row.get("points")).ok_or_else(|| {
            FetchError::InvalidShape(format!("house row {index} ({name}) has non-numeric points"))
        })?;
        let color = row
            .get("color")
            .and_then(Value::as_str)
            .unwrap_or("#888888")
            .to_string();
        houses.push(House {
            name: name.to_string(),
            points,
            color,
        });
    }
    Ok(houses)
}

/// Lenient activity row coercion. Missing or malformed fields drop the row.
fn coerce_event(row: &Value) -> Option<RecentEvent> {
    let timestamp = row.get("timestamp").and_then(Value::as_str)?;
    let house = row.get("house").and_then(Value::as_str)?;
    let points = coerce_points(row.get("points"));
    if points.is_none() {
        warn!(timestamp, house, "dropping activity row with bad points");
    }
    Some(RecentEvent {
        timestamp: timestamp.to_string(),
        house: house.to_string(),
        points: points?,
    })
}

/// Lenient contributor coercion. The sheet labels contributors by email but
/// any non-empty string label is accepted.
fn coerce_contributor(row: &Value) -> Option<Contributor> {
    let label = row
        .get("email")
        .or_else(|| row.get("name"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())?;
    Some(Contributor {
        label: label.to_string(),
        points: coerce_points(row.get("points"))?,
    })
}

/// Accept points as a JSON number or a numeric string. Fractional values
/// are truncated.
fn coerce_points(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
