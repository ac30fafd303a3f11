//! # mb-md
//!
//! Streaming market data feeds. Each feed turns an exchange's WebSocket
//! messages into normalized [`FeedEvent`]s and pushes them through a callback.
//!
//! ## Architecture
//!
//! Each exchange provides a `build(symbols, settings) -> Vec<StreamDef>`
//! function that describes its WebSocket streams. The generic
//! [`pipeline::GenericFeed`] engine opens one connection per stream and runs
//! the stream's parser on every text frame.
//!
//! ## Shared infrastructure
//!
//! - [`pipeline`]: `StreamDef` + `GenericFeed` data-driven engine
//! - [`registry`]: factory keyed by exchange
//! - [`json_util`]: JSON parsing helpers

pub mod binance;
pub mod json_util;
pub mod okx;
pub mod pipeline;
pub mod registry;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mb_core::FeedEvent;

/// Where a feed delivers its normalized events.
///
/// Called from the feed's connection task, once per event, for every
/// producer concurrently.
pub type EventCallback = Arc<dyn Fn(FeedEvent) + Send + Sync>;

/// Trait implemented by every streaming feed.
///
/// Only `Send` is required (not `Sync`) because feeds are driven
/// sequentially by the runner, never concurrently.
#[async_trait]
pub trait FeedSource: Send {
    /// Human-readable feed name.
    fn name(&self) -> &str;
    /// Connect and begin pushing events.
    async fn start(&mut self) -> Result<()>;
    /// Gracefully stop all connections.
    async fn stop(&mut self) -> Result<()>;
}
