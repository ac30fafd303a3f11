//! Rolling per-instrument state and the per-bucket snapshot row.

use super::instrument::InstrumentKey;
use super::market_data::Level;

/// Last known values for one instrument.
///
/// Values survive bucket flushes; a field only changes when an event carries
/// a value for that exact field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiveState {
    pub last_trade_price: Option<f64>,
    pub best_bid: Option<Level>,
    pub best_ask: Option<Level>,

    // Event time of the value currently held in each field. Only consulted
    // under `OrderingPolicy::EventTime`.
    pub trade_ts_ms: Option<u64>,
    pub bid_ts_ms: Option<u64>,
    pub ask_ts_ms: Option<u64>,
}

impl LiveState {
    /// `true` if no event has ever populated any field.
    pub fn is_empty(&self) -> bool {
        self.last_trade_price.is_none() && self.best_bid.is_none() && self.best_ask.is_none()
    }
}

/// One aggregated row: the state of one instrument at the close of one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct MinuteSnapshot {
    /// Bucket start, unix seconds, aligned to 60.
    pub bucket_start: i64,
    pub key: InstrumentKey,
    pub last_price: Option<f64>,
    pub best_bid: Option<Level>,
    pub best_ask: Option<Level>,
}

impl MinuteSnapshot {
    pub fn from_state(bucket_start: i64, key: InstrumentKey, state: &LiveState) -> Self {
        Self {
            bucket_start,
            key,
            last_price: state.last_trade_price,
            best_bid: state.best_bid,
            best_ask: state.best_ask,
        }
    }

    pub fn best_bid_price(&self) -> Option<f64> {
        self.best_bid.map(|l| l.price)
    }

    pub fn best_bid_amount(&self) -> Option<f64> {
        self.best_bid.map(|l| l.amount)
    }

    pub fn best_ask_price(&self) -> Option<f64> {
        self.best_ask.map(|l| l.price)
    }

    pub fn best_ask_amount(&self) -> Option<f64> {
        self.best_ask.map(|l| l.amount)
    }

    /// `true` if any of the output fields is still missing.
    pub fn has_gaps(&self) -> bool {
        self.last_price.is_none() || self.best_bid.is_none() || self.best_ask.is_none()
    }
}

impl std::fmt::Display for MinuteSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Snapshot({} @{} last={:?} bid={:?} ask={:?})",
            self.key,
            self.bucket_start,
            self.last_price,
            self.best_bid_price(),
            self.best_ask_price()
        )
    }
}
