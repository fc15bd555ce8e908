//! Error types for macro resolution.
//!
//! Unresolved macros are not errors: they are substituted with a sentinel
//! (or, for user macros, left as written). Only storage failures and caller
//! mistakes abort a call.

use crate::config::Dispatch;
use thiserror::Error;

/// Errors returned by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A query failed
    #[error("Query {query} failed: {message}")]
    Query { query: &'static str, message: String },

    /// The store cannot be reached at all
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors that abort a resolution call.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No resolution config has this id
    #[error("Unknown resolution config: {0}")]
    UnknownConfig(String),

    /// The config exists but belongs to a different entry point
    #[error("Resolution config {id} expects {actual:?} input, not {expected:?}")]
    WrongDispatch {
        id: &'static str,
        expected: Dispatch,
        actual: Dispatch,
    },

    /// A storage round trip failed; no partial output is returned
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Errors loading [`ResolverSettings`](crate::config::ResolverSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid resolver settings: {0}")]
    Json(#[from] serde_json::Error),
}
