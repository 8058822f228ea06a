//! Field value model.
//!
//! Backend hits are loosely typed JSON objects. Each field is decoded into a
//! [`FieldValue`] so the shaper can reason about value kinds explicitly.

use serde::{Serialize, Serializer};
use std::fmt;

/// A single field value of a backend hit.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text.
    String(String),
    /// A JSON number that fits in `i64`.
    Integer(i64),
    /// Any other JSON number.
    Float(f64),
    /// A JSON boolean.
    Boolean(bool),
    /// A JSON array or object, kept as received.
    Nested(serde_json::Value),
    /// JSON `null`.
    Null,
}

/// The variant of a [`FieldValue`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// [`FieldValue::String`]
    String,
    /// [`FieldValue::Integer`]
    Integer,
    /// [`FieldValue::Float`]
    Float,
    /// [`FieldValue::Boolean`]
    Boolean,
    /// [`FieldValue::Nested`]
    Nested,
    /// [`FieldValue::Null`]
    Null,
}

impl ValueKind {
    /// Integers and floats form one numeric kind when columns are unified.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Nested => write!(f, "nested"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl FieldValue {
    /// Returns the variant of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Nested(_) => ValueKind::Nested,
            Self::Null => ValueKind::Null,
        }
    }

    /// Returns the zero value of this value's variant:
    /// `""`, `0`, `0.0`, `false`, a nested `null`, or `Null`.
    #[must_use]
    pub fn zero_value(&self) -> Self {
        Self::zero_of(self.kind())
    }

    /// Returns the zero value of the given variant.
    #[must_use]
    pub fn zero_of(kind: ValueKind) -> Self {
        match kind {
            ValueKind::String => Self::String(String::new()),
            ValueKind::Integer => Self::Integer(0),
            ValueKind::Float => Self::Float(0.0),
            ValueKind::Boolean => Self::Boolean(false),
            ValueKind::Nested => Self::Nested(serde_json::Value::Null),
            ValueKind::Null => Self::Null,
        }
    }

    /// Returns `true` for [`FieldValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The value as a float, for integers and floats.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a scalar copy: nested values become their compact JSON text.
    #[must_use]
    pub fn to_scalar(&self) -> Self {
        match self {
            Self::Nested(nested) => Self::String(nested.to_string()),
            other => other.clone(),
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Self::String(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Self::Nested(nested)
            }
        }
    }
}

impl From<&FieldValue> for serde_json::Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::String(s) => Self::String(s.clone()),
            FieldValue::Integer(i) => Self::from(*i),
            FieldValue::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(Self::Null, Self::Number)
            }
            FieldValue::Boolean(b) => Self::Bool(*b),
            FieldValue::Nested(nested) => nested.clone(),
            FieldValue::Null => Self::Null,
        }
    }
}

impl<'de> serde::Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Nested(nested) => nested.serialize(serializer),
            Self::Null => serializer.serialize_unit(),
        }
    }
}
