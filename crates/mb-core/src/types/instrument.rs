//! Instrument identity.

use serde::{Deserialize, Serialize};

use super::enums::Exchange;

/// An `(exchange, symbol)` pair tracked for aggregation.
///
/// Symbols are kept in the exchange's own format (`BTCUSDT` on Binance,
/// `BTC-USDT` on OKX).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub exchange: Exchange,
    pub symbol: String,
}

impl InstrumentKey {
    pub fn new(exchange: Exchange, symbol: impl Into<String>) -> Self {
        Self { exchange, symbol: symbol.into() }
    }
}

impl std::fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.exchange, self.symbol)
    }
}
