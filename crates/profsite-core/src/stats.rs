//! Run statistics reader
//!
//! Reads the JSON metrics record a session renders to, and the optional
//! supplementary stats file saved next to a session. Only the documented
//! keys are looked at; everything else in the payload is ignored.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Start time reported when a record has none.
///
/// This is a sentinel for "unknown", not a real timestamp. Rows carrying it
/// sort before every real run.
pub const UNKNOWN_START: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

const START_TIME_KEY: &str = "start_time";
const DURATION_KEY: &str = "duration";

/// Values read from a metrics record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunMetrics {
    /// When the profiled run started
    pub start_time: DateTime<Utc>,
    /// Wall-clock duration in seconds, if the renderer reported one
    pub duration_seconds: Option<f64>,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self {
            start_time: UNKNOWN_START,
            duration_seconds: None,
        }
    }
}

/// Errors while reading stats payloads
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// Payload is not JSON
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is JSON but not an object
    #[error("expected a json object")]
    NotAnObject,

    /// A documented key has the wrong type
    #[error("field '{key}' has unexpected value {value}")]
    InvalidField { key: &'static str, value: Value },
}

/// Read `start_time` (epoch seconds) and `duration` (seconds)
///
/// Each field falls back to its own default independently: a missing
/// `start_time` becomes [`UNKNOWN_START`] and a missing `duration` is `None`.
///
/// # Errors
/// Returns `StatsError` if the payload is not a JSON object or a present
/// field is not numeric
pub fn read_metrics(record: &[u8]) -> Result<RunMetrics, StatsError> {
    let object = parse_object(record)?;
    let mut metrics = RunMetrics::default();

    if let Some(value) = present(&object, START_TIME_KEY) {
        let secs = value.as_f64().ok_or_else(|| invalid(START_TIME_KEY, value))?;
        metrics.start_time = from_epoch_seconds(secs).ok_or_else(|| invalid(START_TIME_KEY, value))?;
    }
    if let Some(value) = present(&object, DURATION_KEY) {
        metrics.duration_seconds = Some(value.as_f64().ok_or_else(|| invalid(DURATION_KEY, value))?);
    }

    Ok(metrics)
}

/// Read the declared columns from a supplementary stats payload
///
/// The result is aligned with `columns`; absent keys read as `None`. An
/// empty column list never looks at the payload.
///
/// # Errors
/// Returns `StatsError` if columns are declared and the payload is not a
/// JSON object
pub fn read_supplementary(payload: &[u8], columns: &[String]) -> Result<Vec<Option<Value>>, StatsError> {
    if columns.is_empty() {
        return Ok(Vec::new());
    }
    let object = parse_object(payload)?;
    Ok(columns
        .iter()
        .map(|column| present(&object, column).cloned())
        .collect())
}

fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, StatsError> {
    match serde_json::from_slice(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(StatsError::NotAnObject),
    }
}

/// Explicit `null` counts as absent
fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| !v.is_null())
}

fn invalid(key: &'static str, value: &Value) -> StatsError {
    StatsError::InvalidField {
        key,
        value: value.clone(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}
