//! Table-mode shaping.
//!
//! Hits are folded row by row into per-column value lists. After each row
//! every requested column is padded to the row count and then re-unified on
//! the variant of its newest value, so a column ends up homogeneous once the
//! last row has been folded in. Integers and floats count as one numeric
//! variant; a numeric column holding any float becomes a float column.
//! Nested arrays and objects enter the table as their JSON text.

use super::ShapeError;
use crate::models::{Column, FieldValue, Hit, TableField, TableFrame, ValueKind};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;

/// Columns whose name contains this marker are converted to time columns.
pub const GF_TIME_MARKER: &str = "gf_time";

const GF_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Builds a table with one field per requested column, in request order.
///
/// Hit fields that were not requested are collected but never emitted.
/// Requested columns that end up with no values are dropped.
///
/// # Errors
///
/// Returns `ShapeError::InvalidTimestamp` for unreadable `gf_time` values and
/// `ShapeError::MixedColumn` if a column cannot be given a single type.
pub fn build_table_frame(columns: &[String], hits: &[Hit]) -> Result<TableFrame, ShapeError> {
    let mut table: HashMap<&str, Vec<FieldValue>> = columns
        .iter()
        .map(|column| (column.as_str(), Vec::with_capacity(hits.len())))
        .collect();

    for (index, hit) in hits.iter().enumerate() {
        for (key, value) in hit {
            if value.is_null() {
                continue;
            }
            table.entry(key.as_str()).or_default().push(value.to_scalar());
        }

        let row_count = index + 1;
        for column in columns {
            let values = table.entry(column.as_str()).or_default();
            pad(values, row_count);
            unify(values);
        }
    }

    let mut fields = Vec::with_capacity(columns.len());
    for name in columns {
        let Some(values) = table.get(name.as_str()) else {
            continue;
        };
        if values.is_empty() {
            continue;
        }

        let column = if name.contains(GF_TIME_MARKER) {
            time_column(name, values)?
        } else {
            typed_column(name, values)?
        };
        fields.push(TableField {
            name: name.clone(),
            column,
        });
    }

    Ok(TableFrame { fields })
}

/// Pads with `""` for an empty column, otherwise with the zero of the last value.
fn pad(values: &mut Vec<FieldValue>, len: usize) {
    while values.len() < len {
        let filler = values
            .last()
            .map_or_else(|| FieldValue::String(String::new()), FieldValue::zero_value);
        values.push(filler);
    }
}

/// Replaces every value whose variant differs from the newest one with that variant's zero.
fn unify(values: &mut [FieldValue]) {
    let Some(mut kind) = values.last().map(FieldValue::kind) else {
        return;
    };
    if kind.is_numeric() && values.iter().any(|value| value.kind() == ValueKind::Float) {
        kind = ValueKind::Float;
    }
    for value in values.iter_mut().rev() {
        if value.kind() == kind {
            continue;
        }
        *value = match value.as_f64() {
            Some(number) if kind == ValueKind::Float => FieldValue::Float(number),
            _ => FieldValue::zero_of(kind),
        };
    }
}

fn mixed(name: &str) -> ShapeError {
    ShapeError::MixedColumn {
        column: name.to_string(),
    }
}

fn typed_column(name: &str, values: &[FieldValue]) -> Result<Column, ShapeError> {
    let kind = values.first().map_or(ValueKind::Null, FieldValue::kind);

    macro_rules! collect {
        ($variant:ident) => {
            values
                .iter()
                .map(|value| match value {
                    FieldValue::$variant(v) => Ok(v.clone()),
                    _ => Err(mixed(name)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Column::$variant)
        };
    }

    match kind {
        ValueKind::String => collect!(String),
        ValueKind::Integer => collect!(Integer),
        ValueKind::Float => collect!(Float),
        ValueKind::Boolean => collect!(Boolean),
        ValueKind::Nested | ValueKind::Null => Err(mixed(name)),
    }
}

fn time_column(name: &str, values: &[FieldValue]) -> Result<Column, ShapeError> {
    values
        .iter()
        .map(|value| {
            parse_time(value).ok_or_else(|| ShapeError::InvalidTimestamp {
                column: name.to_string(),
                value: serde_json::Value::from(value).to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Column::Time)
}

/// Reads a `gf_time` value at millisecond precision.
///
/// Strings are naive UTC date-times, numbers are Unix microseconds.
#[allow(clippy::cast_possible_truncation)]
fn parse_time(value: &FieldValue) -> Option<DateTime<Utc>> {
    let millis = match value {
        FieldValue::String(text) => NaiveDateTime::parse_from_str(text, GF_TIME_FORMAT)
            .ok()?
            .and_utc()
            .timestamp_millis(),
        FieldValue::Integer(micros) => micros / 1000,
        FieldValue::Float(micros) => (*micros as i64) / 1000,
        FieldValue::Boolean(_) | FieldValue::Nested(_) | FieldValue::Null => return None,
    };
    DateTime::from_timestamp_millis(millis)
}
