//! Single WebSocket connection with auto-reconnect and ping keep-alive.
//!
//! Each `WsConnection` runs as a tokio task that:
//! 1. Connects to the exchange endpoint (TLS), bounded by a connect timeout.
//! 2. Sends the subscription message, if any, on every (re)connect.
//! 3. Forwards each text frame to a callback.
//! 4. Sends periodic pings in the exchange's format.
//! 5. Reconnects with exponential backoff until stopped.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::MbError;

/// Callback invoked for each received text message.
pub type OnMessageCallback = Arc<dyn Fn(&str) + Send + Sync>;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Ping payload format, varies by exchange.
#[derive(Debug, Clone)]
pub enum PingPayload {
    /// Send a text frame (OKX sends `"ping"`).
    Text(String),
    /// Use the standard WebSocket ping frame.
    WebSocketPing,
}

/// Configuration for a single WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsConnConfig {
    /// Label used in log lines (e.g. `okx_public`).
    pub label: String,
    /// Full WebSocket URL.
    pub url: String,
    /// Message to send after each successful connect.
    pub subscribe_msg: Option<String>,
    /// Interval between pings; `None` disables client pings.
    pub ping_interval: Option<Duration>,
    pub ping_payload: PingPayload,
    /// Upper bound on the TCP + TLS + upgrade handshake.
    pub connect_timeout: Duration,
}

/// Why a session ended.
enum SessionEnd {
    Shutdown,
    Disconnected,
}

/// A single WebSocket connection managed by a background tokio task.
pub struct WsConnection {
    config: WsConnConfig,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl WsConnection {
    /// Create a new (not yet started) connection.
    pub fn new(config: WsConnConfig) -> Self {
        Self { config, shutdown_tx: None, task: None }
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start the connection task. Calling `start` twice is a no-op.
    pub fn start(&mut self, on_text: OnMessageCallback) {
        if self.task.is_some() {
            return;
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = self.config.clone();

        self.task = Some(tokio::spawn(async move {
            connection_loop(config, on_text, shutdown_rx).await;
        }));
        self.shutdown_tx = Some(shutdown_tx);
    }

    /// Stop the connection and wait for the task to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Connect, run a session, back off, repeat until shutdown.
async fn connection_loop(config: WsConnConfig, on_text: OnMessageCallback, mut shutdown_rx: watch::Receiver<bool>) {
    let label = config.label.as_str();
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if *shutdown_rx.borrow() {
            info!("[{label}] shutdown requested");
            return;
        }

        info!("[{label}] connecting to {}", config.url);
        match connect_ws(&config).await {
            Ok(stream) => {
                info!("[{label}] connected");
                backoff = INITIAL_BACKOFF;
                if let SessionEnd::Shutdown = run_session(&config, stream, &on_text, &mut shutdown_rx).await {
                    return;
                }
                warn!("[{label}] disconnected, reconnecting in {backoff:?}");
            }
            Err(e) => error!("[{label}] connection failed: {e}, retrying in {backoff:?}"),
        }

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {},
            _ = shutdown_rx.changed() => return,
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Subscribe, then pump frames until the peer goes away or shutdown fires.
async fn run_session(
    config: &WsConnConfig,
    stream: WsStream,
    on_text: &OnMessageCallback,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let label = config.label.as_str();
    let (mut ws_write, mut ws_read) = stream.split();

    if let Some(sub_msg) = &config.subscribe_msg {
        debug!("[{label}] subscribing: {sub_msg}");
        if let Err(e) = ws_write.send(Message::Text(sub_msg.clone().into())).await {
            error!("[{label}] subscribe send failed: {e}");
            return SessionEnd::Disconnected;
        }
    }

    // An interval far in the future stands in for "no pings".
    let period = config.ping_interval.unwrap_or(Duration::from_secs(86_400 * 365));
    let mut ping_timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("[{label}] shutdown signal received");
                let _ = ws_write.close().await;
                return SessionEnd::Shutdown;
            }

            msg = ws_read.next() => match msg {
                Some(Ok(Message::Text(text))) => on_text(&text),
                Some(Ok(Message::Ping(data))) => {
                    let _ = ws_write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    warn!("[{label}] received close frame: {frame:?}");
                    return SessionEnd::Disconnected;
                }
                Some(Err(e)) => {
                    error!("[{label}] read error: {e}");
                    return SessionEnd::Disconnected;
                }
                None => {
                    warn!("[{label}] stream ended");
                    return SessionEnd::Disconnected;
                }
                _ => {} // Binary, Pong, Frame are not used by any feed
            },

            _ = ping_timer.tick(), if config.ping_interval.is_some() => {
                let ping = match &config.ping_payload {
                    PingPayload::Text(t) => Message::Text(t.clone().into()),
                    PingPayload::WebSocketPing => Message::Ping(Vec::new().into()),
                };
                if let Err(e) = ws_write.send(ping).await {
                    error!("[{label}] ping send error: {e}");
                    return SessionEnd::Disconnected;
                }
            }
        }
    }
}

/// Establish a TLS WebSocket connection within the configured timeout.
async fn connect_ws(config: &WsConnConfig) -> Result<WsStream, MbError> {
    url::Url::parse(&config.url).map_err(|e| MbError::WebSocket(format!("bad url {}: {e}", config.url)))?;

    match tokio::time::timeout(config.connect_timeout, tokio_tungstenite::connect_async(config.url.as_str())).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(MbError::WebSocket(e.to_string())),
        Err(_) => Err(MbError::WebSocket(format!("connect timed out after {:?}", config.connect_timeout))),
    }
}
