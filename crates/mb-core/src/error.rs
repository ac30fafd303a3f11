//! Typed error definitions for the aggregation service.
//!
//! [`MbError`] covers the failures that cross crate boundaries. All variants
//! implement `std::error::Error` via `thiserror`, so they convert into
//! `anyhow::Result` at lifecycle boundaries.

use thiserror::Error;

/// Domain-specific errors for the aggregation service.
#[derive(Debug, Error)]
pub enum MbError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// WebSocket connection, handshake, or communication error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// An exchange identifier that no feed or backfill supports.
    #[error("unknown exchange: {0}")]
    UnknownExchange(String),
}
