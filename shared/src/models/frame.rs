//! Shaped output frames.
//!
//! A [`ShapedFrame`] is either a time-ordered list of log rows or a table of
//! homogeneously typed columns.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The output of the result shaper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ShapedFrame {
    /// Whole records, newest first.
    Log(LogFrame),
    /// Typed columns.
    Table(TableFrame),
}

impl ShapedFrame {
    /// Number of rows in the frame.
    #[must_use]
    pub fn row_count(&self) -> usize {
        match self {
            Self::Log(frame) => frame.rows.len(),
            Self::Table(frame) => frame.row_count(),
        }
    }
}

/// Log-mode output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogFrame {
    /// Rows ordered by descending timestamp.
    pub rows: Vec<LogRow>,
}

/// One record in log mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRow {
    /// The record's `_timestamp`, Unix microseconds.
    pub timestamp_us: i64,
    /// The whole record as JSON with sorted keys.
    pub body: String,
    /// Same text as `body`, exposed as the row's labels.
    pub labels: String,
}

impl LogRow {
    /// The timestamp as an instant, or `None` when it is out of range.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.timestamp_us)
    }
}

/// Table-mode output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableFrame {
    /// Columns in requested order.
    pub fields: Vec<TableField>,
}

impl TableFrame {
    /// Column names in order.
    #[must_use]
    pub fn headers(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.column)
    }

    /// Number of rows, taken from the first column.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.fields.first().map_or(0, |field| field.column.len())
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableField {
    /// Column name as requested in the select list.
    pub name: String,
    /// Column values.
    pub column: Column,
}

/// A homogeneously typed column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum Column {
    /// Text values.
    String(Vec<String>),
    /// Integer values.
    Integer(Vec<i64>),
    /// Floating-point values.
    Float(Vec<f64>),
    /// Boolean values.
    Boolean(Vec<bool>),
    /// Instants with millisecond precision.
    Time(Vec<DateTime<Utc>>),
}

impl Column {
    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::String(values) => values.len(),
            Self::Integer(values) => values.len(),
            Self::Float(values) => values.len(),
            Self::Boolean(values) => values.len(),
            Self::Time(values) => values.len(),
        }
    }

    /// Whether the column has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
