//! Completes snapshot rows that streaming left partially empty.
//!
//! Calls run one after another on the flush task. A failed call leaves its
//! field missing and moves on; nothing is retried inside one cycle.

use std::sync::Arc;

use mb_core::MinuteSnapshot;
use tracing::{debug, warn};

use crate::backfill::Backfill;

/// Outcome counters for one [`GapFiller::fill`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Fields that were missing when the row came in.
    pub missing: usize,
    /// Fields a backfill call supplied.
    pub filled: usize,
    /// Backfill calls that returned an error.
    pub failures: usize,
}

pub struct GapFiller {
    backfill: Option<Arc<dyn Backfill>>,
    depth: u32,
}

impl GapFiller {
    pub fn new(backfill: Arc<dyn Backfill>, depth: u32) -> Self {
        Self { backfill: Some(backfill), depth }
    }

    /// A filler that leaves every row as it is.
    pub fn disabled() -> Self {
        Self { backfill: None, depth: 0 }
    }

    /// Fill missing fields in place.
    ///
    /// `last_price` and the book are handled independently. A book query only
    /// sets the side(s) that were missing, so a live bid is never replaced by a
    /// REST value when only the ask was absent.
    pub async fn fill(&self, rows: &mut [MinuteSnapshot]) -> FillReport {
        let mut report = FillReport::default();
        for row in rows.iter_mut() {
            report.missing += usize::from(row.last_price.is_none())
                + usize::from(row.best_bid.is_none())
                + usize::from(row.best_ask.is_none());
        }
        let Some(backfill) = &self.backfill else {
            return report;
        };

        for row in rows.iter_mut() {
            let exchange = row.key.exchange;
            let symbol = row.key.symbol.as_str();

            if row.last_price.is_none() {
                match backfill.fetch_last_price(exchange, symbol).await {
                    Ok(Some(price)) => {
                        row.last_price = Some(price);
                        report.filled += 1;
                    }
                    Ok(None) => debug!("no last price available for {}", row.key),
                    Err(e) => {
                        report.failures += 1;
                        warn!("last price backfill failed for {}: {e}", row.key);
                    }
                }
            }

            if row.best_bid.is_none() || row.best_ask.is_none() {
                match backfill.fetch_top_of_book(exchange, symbol, self.depth).await {
                    Ok(top) => {
                        if row.best_bid.is_none() && top.bid.is_some() {
                            row.best_bid = top.bid;
                            report.filled += 1;
                        }
                        if row.best_ask.is_none() && top.ask.is_some() {
                            row.best_ask = top.ask;
                            report.filled += 1;
                        }
                    }
                    Err(e) => {
                        report.failures += 1;
                        warn!("top of book backfill failed for {}: {e}", row.key);
                    }
                }
            }
        }
        report
    }
}
