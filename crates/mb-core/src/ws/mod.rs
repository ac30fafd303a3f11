//! WebSocket client used by the streaming feeds.

pub mod client;

pub use client::{OnMessageCallback, PingPayload, WsConnConfig, WsConnection};
