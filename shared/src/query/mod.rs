//! SQL handling for o2bridge.
//!
//! The query text is never executed here. It is parsed to be inspected
//! ([`analyze`]) or surgically rewritten ([`inject_filters`]) and then sent to
//! OpenObserve as text.
//!
//! # Supported Syntax
//!
//! ```sql
//! SELECT * FROM logs WHERE level = 'error' AND service = 'api'
//! SELECT histogram(_timestamp) AS gf_time, count(*) FROM logs GROUP BY gf_time
//! WITH e AS (SELECT * FROM logs WHERE code >= 500) SELECT host, count(*) FROM e GROUP BY host
//! SELECT host, row_number() OVER (PARTITION BY host ORDER BY _timestamp) AS n FROM logs
//! \dt logs
//! ```
//!
//! # Example
//!
//! ```
//! use shared::query::{analyze, inject_filters, Analysis, FilterCondition};
//!
//! let sql = inject_filters(
//!     "SELECT * FROM logs LIMIT 10",
//!     &[FilterCondition::new("level", "=", "error")],
//! )
//! .unwrap();
//! assert_eq!(sql, "SELECT * FROM logs WHERE level = 'error' LIMIT 10");
//!
//! let Analysis::Select(parsed) = analyze(&sql).unwrap() else {
//!     panic!("expected a SELECT");
//! };
//! assert_eq!(parsed.referenced_variables, vec!["level"]);
//! assert_eq!(parsed.limit, 10);
//! ```

mod analyzer;
mod ast;
mod filter;
mod parser;

pub use analyzer::{
    analyze, analyze_query, is_introspection, Analysis, CommandError, ListStreamsCommand,
    ParsedQuery, SelectMode, INTROSPECTION_PREFIX,
};
pub use ast::*;
pub use filter::{
    inject_filters, FilterCondition, FilterOperator, InjectError, UnsupportedOperatorError,
};
pub use parser::{parse_statement, ParseError};
