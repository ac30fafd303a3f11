//! # mb-core
//!
//! Core crate for the minute-bar aggregation service, providing:
//!
//! - **Types** (`types`): exchanges, instrument keys, feed events, live state and snapshots
//! - **Configuration** (`config`): JSON config deserialization and validation
//! - **Error types** (`error`): domain-specific `MbError` via thiserror
//! - **JSON numbers** (`json_util`): finite number and book level parsing
//! - **WebSocket** (`ws`): WS client with auto-reconnect and ping keep-alive
//! - **Time utilities** (`time_util`): bucket alignment and the injectable `Clock`
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod json_util;
pub mod logging;
pub mod time_util;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use types::*;
