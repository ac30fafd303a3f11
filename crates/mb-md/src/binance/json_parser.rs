//! Binance JSON message parser.
//!
//! Parses combined-stream frames (`{"stream": "...", "data": {...}}`) into
//! [`FeedEvent`]s. Routes by the stream name suffix:
//!
//! - `@ticker` → [`Tick`] from the 24h ticker's last price `c`
//! - `@depth5@100ms` → [`OrderBookTop`] from the partial book `bids`/`asks`

use mb_core::{time_util, *};

use crate::json_util::{parse_f64_field, parse_levels, parse_str_u64};

/// Parse a Binance combined-stream frame.
///
/// Returns `None` for subscription acks, unknown streams, and malformed data.
pub fn parse_message(text: &str) -> Option<FeedEvent> {
    let v: serde_json::Value = serde_json::from_str(text).ok()?;

    let stream = v.get("stream")?.as_str()?;
    let data = v.get("data")?;
    let (stream_symbol, channel) = stream.split_once('@')?;

    if channel == "ticker" {
        parse_ticker(data, stream_symbol)
    } else if channel.starts_with("depth") {
        parse_depth(data, stream_symbol)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Individual parsers
// ---------------------------------------------------------------------------

fn parse_ticker(data: &serde_json::Value, stream_symbol: &str) -> Option<FeedEvent> {
    if data.get("e").and_then(|e| e.as_str()).is_some_and(|e| e != "24hrTicker") {
        return None;
    }
    let symbol =
        data.get("s").and_then(|s| s.as_str()).map(str::to_string).unwrap_or_else(|| stream_symbol.to_uppercase());

    Some(FeedEvent::Tick(Tick {
        exchange: Exchange::Binance,
        symbol,
        price: parse_f64_field(data, "c")?,
        timestamp_ms: parse_str_u64(data.get("E")).unwrap_or_else(time_util::now_ms),
    }))
}

fn parse_depth(data: &serde_json::Value, stream_symbol: &str) -> Option<FeedEvent> {
    // Partial book streams use `bids`/`asks`; diff streams use `b`/`a`.
    let bids = parse_levels(data.get("bids").or_else(|| data.get("b")))?;
    let asks = parse_levels(data.get("asks").or_else(|| data.get("a")))?;
    if bids.is_empty() && asks.is_empty() {
        return None;
    }

    Some(FeedEvent::OrderBook(OrderBookTop {
        exchange: Exchange::Binance,
        symbol: stream_symbol.to_uppercase(),
        bids,
        asks,
        // Partial depth frames carry no event time.
        timestamp_ms: parse_str_u64(data.get("E")).unwrap_or_else(time_util::now_ms),
    }))
}
