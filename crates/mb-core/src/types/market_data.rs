//! Normalized feed events: what every exchange adapter produces.
//!
//! # Timestamp convention
//!
//! `timestamp_ms` is the exchange event time in **milliseconds since Unix
//! epoch**. Adapters that receive no exchange time stamp the local receive
//! time instead. Zero means unknown.

use serde::{Deserialize, Serialize};

use super::enums::Exchange;
use super::instrument::InstrumentKey;

/// One price level of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub amount: f64,
}

impl Level {
    pub fn new(price: f64, amount: f64) -> Self {
        Self { price, amount }
    }
}

/// A last-trade price update.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub exchange: Exchange,
    pub symbol: String,
    pub price: f64,
    pub timestamp_ms: u64,
}

/// Top levels of an order book.
///
/// `bids` are ordered best (highest) first, `asks` best (lowest) first.
/// Either side may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookTop {
    pub exchange: Exchange,
    pub symbol: String,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub timestamp_ms: u64,
}

/// A tagged union of all feed event types.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Tick(Tick),
    OrderBook(OrderBookTop),
}

impl FeedEvent {
    /// The instrument this event belongs to.
    pub fn key(&self) -> InstrumentKey {
        match self {
            Self::Tick(t) => InstrumentKey::new(t.exchange, t.symbol.clone()),
            Self::OrderBook(o) => InstrumentKey::new(o.exchange, o.symbol.clone()),
        }
    }
}

impl std::fmt::Display for FeedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tick(t) => write!(f, "Tick({}:{} {:.8} ts={})", t.exchange, t.symbol, t.price, t.timestamp_ms),
            Self::OrderBook(o) => {
                let bid = o.bids.first().map(|l| l.price);
                let ask = o.asks.first().map(|l| l.price);
                write!(f, "Book({}:{} bid={bid:?} ask={ask:?} ts={})", o.exchange, o.symbol, o.timestamp_ms)
            }
        }
    }
}
