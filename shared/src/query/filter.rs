//! Ad-hoc filter injection.
//!
//! Splices externally supplied `key operator value` conditions into the
//! WHERE clause of a query and re-serializes it.

use super::analyzer::is_introspection;
use super::ast::{BinaryOperator, Expr, Ident, Literal};
use super::parser::{parse_statement, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A condition supplied by the caller, as received on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Column name, rendered verbatim.
    pub key: String,
    /// Operator symbol (`=`, `!=`, `=~`, `!~`, `<`, `>`) or name (`EQ`, ...).
    pub operator: String,
    /// Value, quoted unless written as `number(<literal>)`.
    pub value: String,
}

impl FilterCondition {
    /// Creates a condition.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Returns the unwrapped literal when the value is `number(<literal>)`.
    #[must_use]
    pub fn number_value(&self) -> Option<&str> {
        self.value
            .strip_prefix("number(")
            .and_then(|rest| rest.strip_suffix(')'))
            .filter(|inner| !inner.is_empty())
    }

    fn to_expr(&self) -> Result<Expr, UnsupportedOperatorError> {
        let operator = FilterOperator::from_symbol(&self.operator)?;
        let right = match self.number_value() {
            Some(number) => Expr::Literal(Literal::Number(number.to_string())),
            None => Expr::Literal(Literal::String(self.value.clone())),
        };
        Ok(Expr::binary(
            Expr::Identifier(Ident::new(self.key.clone())),
            operator.sql_operator(),
            right,
        ))
    }
}

/// The supported filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Regular expression match.
    MatchRegex,
    /// Negated regular expression match.
    NotMatchRegex,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
}

/// Wire symbol, symbolic name, operator.
const OPERATOR_TABLE: [(&str, &str, FilterOperator); 6] = [
    ("=", "EQ", FilterOperator::Eq),
    ("!=", "NEQ", FilterOperator::Neq),
    ("=~", "MATCH_REGEX", FilterOperator::MatchRegex),
    ("!~", "NOT_MATCH_REGEX", FilterOperator::NotMatchRegex),
    ("<", "LT", FilterOperator::Lt),
    (">", "GT", FilterOperator::Gt),
];

impl FilterOperator {
    /// Resolves a wire symbol or symbolic name.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperatorError` when `symbol` is not in the table.
    pub fn from_symbol(symbol: &str) -> Result<Self, UnsupportedOperatorError> {
        OPERATOR_TABLE
            .iter()
            .find(|(wire, name, _)| *wire == symbol || *name == symbol)
            .map(|(_, _, operator)| *operator)
            .ok_or_else(|| UnsupportedOperatorError(symbol.to_string()))
    }

    /// The SQL operator this filter operator is rendered as.
    #[must_use]
    pub fn sql_operator(self) -> BinaryOperator {
        match self {
            Self::Eq => BinaryOperator::Eq,
            Self::Neq => BinaryOperator::NotEq,
            Self::MatchRegex => BinaryOperator::RegexMatch,
            Self::NotMatchRegex => BinaryOperator::NotRegexMatch,
            Self::Lt => BinaryOperator::Lt,
            Self::Gt => BinaryOperator::Gt,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = OPERATOR_TABLE
            .iter()
            .find(|(_, _, operator)| operator == self)
            .map_or("", |(_, name, _)| *name);
        f.write_str(name)
    }
}

/// A filter operator outside the supported table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported operation: {0}")]
pub struct UnsupportedOperatorError(pub String);

/// Errors that can occur while injecting filters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    /// The query could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A condition used an unsupported operator.
    #[error(transparent)]
    UnsupportedOperator(#[from] UnsupportedOperatorError),

    /// The query combines SELECT blocks, so there is no single WHERE clause.
    #[error("cannot add filters to a UNION, EXCEPT or INTERSECT query")]
    SetOperation,
}

/// ANDs `conditions` onto the WHERE clause of `query`, in order, and returns
/// the re-serialized statement.
///
/// Introspection commands are returned unchanged.
///
/// # Errors
///
/// Returns `InjectError::Parse` when `query` is not a SELECT,
/// `InjectError::SetOperation` when there are conditions but the body is a
/// set operation, and `InjectError::UnsupportedOperator` when any condition
/// has an operator outside the table. Nothing is injected in any of these
/// cases.
///
/// # Examples
///
/// ```
/// use shared::query::{inject_filters, FilterCondition};
///
/// let sql = inject_filters(
///     "SELECT * FROM logs",
///     &[FilterCondition::new("code", "<", "number(500)")],
/// )
/// .unwrap();
/// assert_eq!(sql, "SELECT * FROM logs WHERE code < 500");
/// ```
pub fn inject_filters(query: &str, conditions: &[FilterCondition]) -> Result<String, InjectError> {
    if is_introspection(query) {
        return Ok(query.to_string());
    }

    let mut statement = parse_statement(query)?;
    if !conditions.is_empty() {
        let select = statement.select_mut().ok_or(InjectError::SetOperation)?;
        for condition in conditions {
            select.and_where(condition.to_expr()?);
        }
    }

    tracing::debug!(conditions = conditions.len(), "Injected filters");
    Ok(statement.to_string())
}
