//! OKX market data: stream definitions.
//!
//! Produces one [`StreamDef`] on the public endpoint, subscribed to `tickers`
//! and `books5` for every instId. OKX drops idle connections after 30 s, so a
//! text `"ping"` is sent on the configured interval.

pub mod json_parser;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use mb_core::{config::FeedsConfig, ws::PingPayload};

use crate::pipeline::{PingConfig, StreamDef};

const OKX_WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";

/// Build OKX stream definitions for the given instIds (`BTC-USDT` format).
pub fn build(symbols: &[String], feeds: &FeedsConfig) -> Result<Vec<StreamDef>> {
    if symbols.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(bad) = symbols.iter().find(|s| !s.contains('-')) {
        bail!("invalid okx instId '{bad}' (expected e.g. BTC-USDT)");
    }

    let ping = PingConfig {
        interval: Duration::from_secs(feeds.ping_interval_sec.max(1)),
        payload: PingPayload::Text("ping".into()),
    };

    Ok(vec![StreamDef {
        label: "okx_public".into(),
        ws_url: OKX_WS_URL.into(),
        subscribe_msg: Some(json_parser::build_subscribe(symbols)),
        ping: Some(ping),
        parser: Arc::new(|text| json_parser::parse_message(text).into_iter().collect()),
    }])
}
