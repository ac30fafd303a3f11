//! OKX JSON message parser.
//!
//! Parses public-channel push messages into [`FeedEvent`]s. Routes by the
//! `arg.channel` field:
//!
//! - `tickers` → [`Tick`] from `data[0].last`
//! - `books5` → [`OrderBookTop`] from `data[0].bids` / `data[0].asks`

use mb_core::*;

use crate::json_util::{parse_levels, parse_str_f64, parse_str_u64};

/// Parse an OKX JSON WebSocket message.
///
/// Returns `None` for non-data messages (subscription acks, pong, errors).
pub fn parse_message(text: &str) -> Option<FeedEvent> {
    // OKX answers our text "ping" with a bare "pong".
    if text == "pong" {
        return None;
    }

    let v: serde_json::Value = serde_json::from_str(text).ok()?;
    if v.get("event").is_some() {
        return None;
    }

    let arg = v.get("arg")?;
    let channel = arg.get("channel")?.as_str()?;
    let inst_id = arg.get("instId")?.as_str()?;
    let data = v.get("data")?.as_array()?.first()?;

    match channel {
        "tickers" => parse_ticker(data, inst_id),
        "books5" => parse_books5(data, inst_id),
        _ => None,
    }
}

/// Build the subscription message: `tickers` and `books5` per instId.
pub fn build_subscribe(symbols: &[String]) -> String {
    let args: Vec<serde_json::Value> = symbols
        .iter()
        .flat_map(|s| {
            [
                serde_json::json!({"channel": "tickers", "instId": s}),
                serde_json::json!({"channel": "books5", "instId": s}),
            ]
        })
        .collect();

    serde_json::json!({
        "op": "subscribe",
        "args": args
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Individual parsers
// ---------------------------------------------------------------------------

fn parse_ticker(data: &serde_json::Value, inst_id: &str) -> Option<FeedEvent> {
    Some(FeedEvent::Tick(Tick {
        exchange: Exchange::Okx,
        symbol: inst_id.to_string(),
        price: parse_str_f64(data.get("last"))?,
        timestamp_ms: parse_str_u64(data.get("ts")).unwrap_or(0),
    }))
}

fn parse_books5(data: &serde_json::Value, inst_id: &str) -> Option<FeedEvent> {
    let bids = parse_levels(data.get("bids"))?;
    let asks = parse_levels(data.get("asks"))?;
    if bids.is_empty() && asks.is_empty() {
        return None;
    }

    Some(FeedEvent::OrderBook(OrderBookTop {
        exchange: Exchange::Okx,
        symbol: inst_id.to_string(),
        bids,
        asks,
        timestamp_ms: parse_str_u64(data.get("ts")).unwrap_or(0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tickers_push() {
        let json = r#"{
            "arg": {"channel": "tickers", "instId": "BTC-USDT"},
            "data": [{"instId": "BTC-USDT", "last": "30001.5", "lastSz": "0.01", "ts": "1672515782200"}]
        }"#;
        match parse_message(json).unwrap() {
            FeedEvent::Tick(t) => {
                assert_eq!(t.exchange, Exchange::Okx);
                assert_eq!(t.symbol, "BTC-USDT");
                assert!((t.price - 30001.5).abs() < 1e-9);
                assert_eq!(t.timestamp_ms, 1672515782200);
            }
            other => panic!("expected Tick, got {other:?}"),
        }
    }

    #[test]
    fn parse_books5_push() {
        let json = r#"{
            "arg": {"channel": "books5", "instId": "ETH-USDT"},
            "data": [{
                "asks": [["2500.2", "0.5", "0", "3"], ["2500.3", "1", "0", "1"]],
                "bids": [["2500.1", "0.3", "0", "2"]],
                "ts": "1672515782136"
            }]
        }"#;
        match parse_message(json).unwrap() {
            FeedEvent::OrderBook(ob) => {
                assert_eq!(ob.symbol, "ETH-USDT");
                assert_eq!(ob.bids, vec![Level::new(2500.1, 0.3)]);
                assert_eq!(ob.asks.first(), Some(&Level::new(2500.2, 0.5)));
                assert_eq!(ob.timestamp_ms, 1672515782136);
            }
            other => panic!("expected OrderBook, got {other:?}"),
        }
    }

    #[test]
    fn damaged_level_drops_the_frame() {
        let json = r#"{
            "arg": {"channel": "books5", "instId": "ETH-USDT"},
            "data": [{"asks": [["2500.2", "0.5"]], "bids": [["2500.1"], ["2500.0", "1"]], "ts": "1"}]
        }"#;
        assert!(parse_message(json).is_none());
    }

    #[test]
    fn acks_and_pong_return_none() {
        assert!(parse_message("pong").is_none());
        assert!(
            parse_message(r#"{"event": "subscribe", "arg": {"channel": "tickers", "instId": "BTC-USDT"}}"#).is_none()
        );
        assert!(parse_message(r#"{"arg": {"channel": "tickers", "instId": "BTC-USDT"}, "data": []}"#).is_none());
        assert!(parse_message("{not json").is_none());
    }

    #[test]
    fn subscribe_lists_both_channels() {
        let msg: serde_json::Value = serde_json::from_str(&build_subscribe(&["BTC-USDT".into()])).unwrap();
        assert_eq!(msg["op"], "subscribe");
        let args = msg["args"].as_array().unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0]["channel"], "tickers");
        assert_eq!(args[1]["channel"], "books5");
        assert_eq!(args[1]["instId"], "BTC-USDT");
    }
}
