//! o2bridge Shared Library
//!
//! This crate contains the query bridge between SQL written against
//! OpenObserve and typed, columnar result frames.
//!
//! # Modules
//!
//! - [`query`] - SQL parsing, query analysis and ad-hoc filter injection
//! - [`client`] - Search backends and the OpenObserve HTTP client
//! - [`shaper`] - Conversion of raw hits into log or table frames
//! - [`pipeline`] - End-to-end execution of single queries and batches
//! - [`models`] - Wire types, field values and frames
//! - [`config`] - Backend connection settings
//!
//! # Example
//!
//! ```
//! use shared::query::{inject_filters, FilterCondition};
//!
//! let sql = inject_filters(
//!     "SELECT * FROM logs",
//!     &[FilterCondition::new("level", "=", "error")],
//! )
//! .unwrap();
//!
//! assert_eq!(sql, "SELECT * FROM logs WHERE level = 'error'");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod shaper;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
