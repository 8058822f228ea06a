//! Log-mode shaping.

use super::ShapeError;
use crate::models::{FieldValue, Hit, LogFrame, LogRow};

/// Field holding a record's timestamp, in Unix microseconds.
pub const TIMESTAMP_FIELD: &str = "_timestamp";

/// Builds one row per hit, newest first.
///
/// The row timestamp is the hit's `_timestamp` (floats truncated, anything
/// else read as 0). Body and labels are the whole hit as JSON with sorted keys.
///
/// # Errors
///
/// Returns `ShapeError::Encode` if a hit cannot be serialized.
pub fn build_log_frame(hits: &[Hit]) -> Result<LogFrame, ShapeError> {
    let mut rows = hits
        .iter()
        .map(|hit| {
            let body = serde_json::to_string(hit)?;
            Ok(LogRow {
                timestamp_us: timestamp_of(hit),
                labels: body.clone(),
                body,
            })
        })
        .collect::<Result<Vec<_>, ShapeError>>()?;

    rows.sort_by(|a, b| b.timestamp_us.cmp(&a.timestamp_us));
    Ok(LogFrame { rows })
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp_of(hit: &Hit) -> i64 {
    match hit.get(TIMESTAMP_FIELD) {
        Some(FieldValue::Integer(ts)) => *ts,
        Some(FieldValue::Float(ts)) => *ts as i64,
        _ => 0,
    }
}
