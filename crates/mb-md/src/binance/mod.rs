//! Binance spot market data: stream definitions.
//!
//! Produces one [`StreamDef`]: a combined stream carrying `@ticker` (last
//! price) and `@depth5@100ms` (top of book) for every symbol. Binance pings
//! the client, so no client-side ping is configured.

pub mod json_parser;

use std::sync::Arc;

use anyhow::{Result, bail};
use mb_core::config::FeedsConfig;

use crate::pipeline::StreamDef;

const BINANCE_WS_BASE: &str = "wss://stream.binance.com:9443/stream";

/// Build Binance stream definitions for the given symbols (`BTCUSDT` format).
pub fn build(symbols: &[String], _feeds: &FeedsConfig) -> Result<Vec<StreamDef>> {
    if symbols.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(bad) = symbols.iter().find(|s| s.contains(['/', '@', '-'])) {
        bail!("invalid binance symbol '{bad}'");
    }

    Ok(vec![StreamDef {
        label: "binance_spot".into(),
        ws_url: combined_stream_url(symbols),
        subscribe_msg: None,
        ping: None,
        parser: Arc::new(|text| json_parser::parse_message(text).into_iter().collect()),
    }])
}

/// `wss://.../stream?streams=btcusdt@ticker/btcusdt@depth5@100ms/...`
pub fn combined_stream_url(symbols: &[String]) -> String {
    let streams: Vec<String> = symbols
        .iter()
        .flat_map(|s| {
            let lower = s.to_lowercase();
            [format!("{lower}@ticker"), format!("{lower}@depth5@100ms")]
        })
        .collect();
    format!("{BINANCE_WS_BASE}?streams={}", streams.join("/"))
}
