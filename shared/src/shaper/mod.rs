//! Result shaping.
//!
//! Converts the loosely typed hits of a [`ResultEnvelope`] into a
//! [`ShapedFrame`]. A wildcard select (or one with no nameable columns) gives
//! log mode, anything else gives table mode.

mod log;
mod table;

pub use log::{build_log_frame, TIMESTAMP_FIELD};
pub use table::{build_table_frame, GF_TIME_MARKER};

use crate::models::{
    Column, ResultEnvelope, ShapedFrame, StreamInfo, TableField, TableFrame,
};
use crate::query::ParsedQuery;
use thiserror::Error;

/// Name of the single column of the stream listing frame.
pub const STREAM_COLUMN: &str = "stream";

/// Errors that can occur while shaping results.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// A time column value could not be interpreted.
    #[error("invalid timestamp in column {column}: {value}")]
    InvalidTimestamp {
        /// Column name.
        column: String,
        /// The offending value.
        value: String,
    },

    /// A column could not be given a single value type.
    #[error("column {column} mixes value types")]
    MixedColumn {
        /// Column name.
        column: String,
    },

    /// A hit could not be encoded as JSON.
    #[error("failed to encode hit: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Shapes an envelope according to the analyzed query.
///
/// # Errors
///
/// Returns a `ShapeError` when a hit cannot be encoded, a `gf_time` value
/// cannot be read as a timestamp, or a column cannot be typed.
pub fn shape(parsed: &ParsedQuery, envelope: &ResultEnvelope) -> Result<ShapedFrame, ShapeError> {
    if parsed.is_log_mode() {
        tracing::debug!(hits = envelope.hits.len(), "Shaping results in log mode");
        return Ok(ShapedFrame::Log(build_log_frame(&envelope.hits)?));
    }

    tracing::debug!(
        hits = envelope.hits.len(),
        columns = ?parsed.selected_columns,
        "Shaping results in table mode"
    );
    Ok(ShapedFrame::Table(build_table_frame(
        &parsed.selected_columns,
        &envelope.hits,
    )?))
}

/// Builds the single-column frame listing stream names in sorted order.
#[must_use]
pub fn streams_frame(streams: &[StreamInfo]) -> TableFrame {
    let mut names: Vec<String> = streams
        .iter()
        .filter(|stream| !stream.name.is_empty())
        .map(|stream| stream.name.clone())
        .collect();
    names.sort();
    TableFrame {
        fields: vec![TableField {
            name: STREAM_COLUMN.to_string(),
            column: Column::String(names),
        }],
    }
}
