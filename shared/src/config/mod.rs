//! Configuration module for o2bridge.
//!
//! This module contains the settings used to reach the OpenObserve backend.

pub mod backend;

pub use backend::{
    BackendConfig, ConfigError, DEFAULT_BACKEND_URL, DEFAULT_BACKEND_USER, DEFAULT_ORGANIZATION,
    DEFAULT_TIMEOUT_SECS,
};
