//! Data models for o2bridge.
//!
//! This module contains the backend wire types (search requests, result
//! envelopes, stream listings) and the shaped output frames.

pub mod frame;
pub mod search;
pub mod stream;
pub mod value;

pub use frame::{Column, LogFrame, LogRow, ShapedFrame, TableField, TableFrame};
pub use search::{
    Hit, InvalidStreamTypeError, ResultEnvelope, SearchQuery, SearchRequestBody,
    SearchRequestParams, StreamType, TookDetail, DEFAULT_RESULT_SIZE, DEFAULT_SEARCH_TYPE,
    SEARCH_TIMEOUT_SECS,
};
pub use stream::{ListStreamResponse, SchemaField, StreamInfo};
pub use value::{FieldValue, ValueKind};
