//! Query analysis.
//!
//! Recovers what the shaper needs to know about a query: whether it selects
//! every column, the names of the selected columns, the column references in
//! the WHERE clause and the LIMIT.

use super::ast::{Expr, FunctionArg, Literal, Query, SelectItem};
use super::parser::{parse_statement, ParseError};
use crate::models::StreamType;
use serde::Serialize;
use thiserror::Error;

/// Prefix of the stream listing command.
pub const INTROSPECTION_PREFIX: &str = "\\dt";

/// How the select list was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    /// Exactly `SELECT *`.
    AllColumns,
    /// Anything else.
    ExplicitColumns,
}

/// The analyzer's view of a query statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    /// Wildcard or explicit columns.
    pub select_mode: SelectMode,
    /// Alias, or raw expression text, of each select item in source order.
    pub selected_columns: Vec<String>,
    /// Column references of the WHERE clauses in pre-order, duplicates kept.
    pub referenced_variables: Vec<String>,
    /// LIMIT row count; 0 when absent or not a plain integer.
    pub limit: u64,
}

impl ParsedQuery {
    /// Whether results should be shaped as whole log records.
    #[must_use]
    pub fn is_log_mode(&self) -> bool {
        self.select_mode == SelectMode::AllColumns || self.selected_columns.is_empty()
    }
}

/// Result of [`analyze`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    /// A `\dt ...` command, returned unparsed.
    Introspection(String),
    /// An ordinary SELECT.
    Select(ParsedQuery),
}

/// Returns `true` when `query` is a stream listing command.
#[must_use]
pub fn is_introspection(query: &str) -> bool {
    query.starts_with(INTROSPECTION_PREFIX)
}

/// Analyzes a query string.
///
/// # Errors
///
/// Returns a `ParseError` when the text is neither an introspection command
/// nor a well-formed SELECT.
///
/// # Examples
///
/// ```
/// use shared::query::{analyze, Analysis, SelectMode};
///
/// let sql = "SELECT level AS l, code FROM logs LIMIT 5";
/// let Analysis::Select(parsed) = analyze(sql).unwrap() else {
///     panic!("expected a SELECT");
/// };
/// assert_eq!(parsed.select_mode, SelectMode::ExplicitColumns);
/// assert_eq!(parsed.selected_columns, vec!["l", "code"]);
/// assert_eq!(parsed.limit, 5);
/// ```
pub fn analyze(query: &str) -> Result<Analysis, ParseError> {
    if is_introspection(query) {
        return Ok(Analysis::Introspection(query.to_string()));
    }

    let statement = parse_statement(query)?;
    let parsed = analyze_query(&statement);

    tracing::debug!(
        select_mode = ?parsed.select_mode,
        columns = parsed.selected_columns.len(),
        variables = parsed.referenced_variables.len(),
        limit = parsed.limit,
        "Analyzed query"
    );

    Ok(Analysis::Select(parsed))
}

/// Builds a [`ParsedQuery`] from an already parsed statement.
///
/// Columns come from the leftmost SELECT block, which names the columns of a
/// set operation. WHERE references are gathered from every block of the
/// body, left to right; CTEs are not entered.
#[must_use]
pub fn analyze_query(query: &Query) -> ParsedQuery {
    let select = query.body.leftmost_select();
    let all_columns = matches!(select.projection.as_slice(), [SelectItem::Wildcard]);

    let selected_columns = if all_columns {
        vec!["*".to_string()]
    } else {
        select
            .projection
            .iter()
            .filter_map(|item| match item {
                SelectItem::Wildcard | SelectItem::QualifiedWildcard(_) => None,
                SelectItem::Expr { alias, text, .. } => Some(
                    alias
                        .as_ref()
                        .map_or_else(|| text.clone(), |alias| alias.value.clone()),
                ),
            })
            .collect()
    };

    let mut referenced_variables = Vec::new();
    for block in query.body.selects() {
        if let Some(selection) = &block.selection {
            collect_variables(selection, &mut referenced_variables);
        }
    }

    ParsedQuery {
        select_mode: if all_columns {
            SelectMode::AllColumns
        } else {
            SelectMode::ExplicitColumns
        },
        selected_columns,
        referenced_variables,
        limit: query.limit.as_ref().map_or(0, limit_value),
    }
}

fn limit_value(limit: &Expr) -> u64 {
    match limit {
        Expr::Literal(Literal::Number(n)) => n.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Pre-order walk collecting column references; subqueries are not entered.
fn collect_variables(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Identifier(ident) => out.push(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => out.push(
            parts
                .iter()
                .map(|part| part.value.as_str())
                .collect::<Vec<_>>()
                .join("."),
        ),
        Expr::Literal(_) | Expr::Subquery(_) => {}
        Expr::UnaryOp { expr, .. }
        | Expr::Nested(expr)
        | Expr::Extract { expr, .. }
        | Expr::Cast { expr, .. }
        | Expr::TypeCast { expr, .. }
        | Expr::IsNull { expr, .. }
        | Expr::InSubquery { expr, .. } => collect_variables(expr, out),
        Expr::BinaryOp { left, right, .. } => {
            collect_variables(left, out);
            collect_variables(right, out);
        }
        Expr::Function(function) => {
            for arg in &function.args {
                if let FunctionArg::Expr(arg) = arg {
                    collect_variables(arg, out);
                }
            }
        }
        Expr::Case {
            operand,
            branches,
            else_result,
        } => {
            if let Some(operand) = operand {
                collect_variables(operand, out);
            }
            for branch in branches {
                collect_variables(&branch.condition, out);
                collect_variables(&branch.result, out);
            }
            if let Some(else_result) = else_result {
                collect_variables(else_result, out);
            }
        }
        Expr::InList { expr, list, .. } => {
            collect_variables(expr, out);
            for item in list {
                collect_variables(item, out);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            collect_variables(expr, out);
            collect_variables(low, out);
            collect_variables(high, out);
        }
        Expr::Like { expr, pattern, .. } => {
            collect_variables(expr, out);
            collect_variables(pattern, out);
        }
    }
}

/// Errors for malformed introspection commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The command is not `\dt <kind>`.
    #[error("invalid command: {0}, expected format: \\dt <stream_type>")]
    InvalidFormat(String),

    /// The kind is not a known stream type.
    #[error(transparent)]
    InvalidStreamType(#[from] crate::models::InvalidStreamTypeError),
}

/// A parsed `\dt <kind>` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListStreamsCommand {
    /// The kind of streams to list.
    pub stream_type: StreamType,
}

impl ListStreamsCommand {
    /// Parses an introspection command.
    ///
    /// The command must be exactly `\dt` and a stream type separated by one
    /// space.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` for any other shape or an unknown kind.
    pub fn parse(command: &str) -> Result<Self, CommandError> {
        let parts: Vec<&str> = command.split(' ').collect();
        match parts.as_slice() {
            [prefix, kind] if *prefix == INTROSPECTION_PREFIX => Ok(Self {
                stream_type: kind.parse()?,
            }),
            _ => Err(CommandError::InvalidFormat(command.to_string())),
        }
    }
}
