//! Generic feed pipeline engine.
//!
//! Provides [`GenericFeed`], a data-driven implementation of [`FeedSource`].
//! Each exchange only describes its streams as [`StreamDef`]s; the engine
//! opens the connections, runs the parsers, and forwards events.
//!
//! # Architecture
//!
//! ```text
//! StreamDef ──► GenericFeed.start() ──► WsConnection per stream
//!                                        └─ text frame ─► parser ─► EventCallback
//!          ──► GenericFeed.stop()  ──► stop every connection
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mb_core::FeedEvent;
use mb_core::ws::{OnMessageCallback, PingPayload, WsConnConfig, WsConnection};
use tracing::{debug, info, trace};

use crate::{EventCallback, FeedSource};

/// A text message parser: `raw_json -> Vec<FeedEvent>`.
///
/// Returns an empty vec for anything that is not market data, including
/// malformed frames.
pub type TextParser = Arc<dyn Fn(&str) -> Vec<FeedEvent> + Send + Sync>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ping / keep-alive configuration for a WebSocket connection.
#[derive(Debug, Clone)]
pub struct PingConfig {
    pub interval: Duration,
    pub payload: PingPayload,
}

/// Everything needed to run one WebSocket stream.
pub struct StreamDef {
    /// Human-readable label (e.g. `"okx_public"`).
    pub label: String,
    /// WebSocket URL.
    pub ws_url: String,
    /// Subscription message sent after each connect.
    pub subscribe_msg: Option<String>,
    /// Ping configuration (exchange-specific format and interval).
    pub ping: Option<PingConfig>,
    pub parser: TextParser,
}

/// Generic feed driven by [`StreamDef`] descriptors.
pub struct GenericFeed {
    name: String,
    streams: Vec<StreamDef>,
    on_event: EventCallback,
    connect_timeout: Duration,
    connections: Vec<WsConnection>,
}

impl GenericFeed {
    /// Create a new generic feed. Nothing connects until [`FeedSource::start`].
    pub fn new(name: impl Into<String>, streams: Vec<StreamDef>, on_event: EventCallback) -> Self {
        Self {
            name: name.into(),
            streams,
            on_event,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connections: Vec::new(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

/// Wrap a parser and the event sink into the raw text callback the WebSocket
/// client expects.
pub fn text_handler(label: String, parser: TextParser, on_event: EventCallback) -> OnMessageCallback {
    Arc::new(move |text: &str| {
        let events = parser(text);
        if events.is_empty() {
            trace!("[{label}] ignored frame: {text}");
        }
        for event in events {
            on_event(event);
        }
    })
}

#[async_trait]
impl FeedSource for GenericFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> Result<()> {
        if !self.connections.is_empty() {
            return Ok(());
        }
        for stream in &self.streams {
            let config = WsConnConfig {
                label: stream.label.clone(),
                url: stream.ws_url.clone(),
                subscribe_msg: stream.subscribe_msg.clone(),
                ping_interval: stream.ping.as_ref().map(|p| p.interval),
                ping_payload: stream.ping.as_ref().map(|p| p.payload.clone()).unwrap_or(PingPayload::WebSocketPing),
                connect_timeout: self.connect_timeout,
            };
            let mut conn = WsConnection::new(config);
            conn.start(text_handler(stream.label.clone(), stream.parser.clone(), self.on_event.clone()));
            self.connections.push(conn);
        }

        info!("[{}] started {} stream(s)", self.name, self.connections.len());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        for mut conn in self.connections.drain(..) {
            conn.stop().await;
            debug!("[{}] closed {}", self.name, conn.label());
        }
        info!("[{}] stopped", self.name);
        Ok(())
    }
}
