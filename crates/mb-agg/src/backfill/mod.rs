//! Backfill capability: on-demand queries used to complete a snapshot row
//! when streaming produced no value.
//!
//! Every call returns an explicit `Result`. The gap filler currently counts
//! failures and otherwise treats them as "no value", but the detail stays
//! available to callers.

pub mod rest;

use async_trait::async_trait;
use mb_core::{Exchange, Level};
use thiserror::Error;

pub use rest::RestBackfill;

/// Failure of a single backfill call.
#[derive(Debug, Error)]
pub enum BackfillError {
    /// Transport failure, timeout, or undecodable body.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The body was JSON but not the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Best bid and ask as reported by a backfill query. Either side may be
/// missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TopOfBook {
    pub bid: Option<Level>,
    pub ask: Option<Level>,
}

impl TopOfBook {
    pub fn is_empty(&self) -> bool {
        self.bid.is_none() && self.ask.is_none()
    }
}

/// Source of last-price and top-of-book values outside the streaming path.
///
/// Implementations must bound every call with their own timeout.
#[async_trait]
pub trait Backfill: Send + Sync {
    /// Latest trade price, `Ok(None)` if the venue has none.
    async fn fetch_last_price(&self, exchange: Exchange, symbol: &str) -> Result<Option<f64>, BackfillError>;

    /// Best levels of a `depth`-level book snapshot.
    async fn fetch_top_of_book(&self, exchange: Exchange, symbol: &str, depth: u32) -> Result<TopOfBook, BackfillError>;
}
