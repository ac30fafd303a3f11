//! One flush cycle: copy state, build rows, fill gaps, write.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use crate::extractor::extract;
use crate::gap_filler::{FillReport, GapFiller};
use crate::sink::StorageSink;
use crate::store::StateStore;

/// What one flush produced, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub bucket_start: i64,
    pub rows: usize,
    pub fill: FillReport,
    pub elapsed_ms: u64,
}

pub struct Aggregator {
    store: Arc<StateStore>,
    gap_filler: GapFiller,
    sink: Arc<dyn StorageSink>,
}

impl Aggregator {
    pub fn new(store: Arc<StateStore>, gap_filler: GapFiller, sink: Arc<dyn StorageSink>) -> Self {
        Self { store, gap_filler, sink }
    }

    /// Flush the current rolling state tagged with `bucket_start`.
    ///
    /// The store lock is held only for the copy. Backfill and storage run on
    /// the copy, so feeds keep writing throughout. Storage errors propagate;
    /// backfill errors only show up in the report.
    pub async fn flush(&self, bucket_start: i64) -> Result<FlushReport> {
        let mut reports = self.flush_many(&[bucket_start]).await?;
        reports.pop().context("flush produced no report")
    }

    /// Flush several buckets in order from one state copy, stopping at the
    /// first storage error.
    ///
    /// The state is read and gap-filled once; every bucket gets the same
    /// values under its own `bucket_start`. The fill counts are reported on
    /// the first bucket only.
    pub async fn flush_many(&self, buckets: &[i64]) -> Result<Vec<FlushReport>> {
        let Some(&first) = buckets.first() else {
            return Ok(Vec::new());
        };
        let started = Instant::now();
        let state = self.store.read_all();
        let mut rows = extract(first, &state);
        let mut fill = self.gap_filler.fill(&mut rows).await;

        let mut reports = Vec::with_capacity(buckets.len());
        for &bucket_start in buckets {
            for row in &mut rows {
                row.bucket_start = bucket_start;
            }
            self.sink
                .write_batch(&rows)
                .await
                .with_context(|| format!("writing bucket {bucket_start} to {}", self.sink.name()))?;

            let report = FlushReport {
                bucket_start,
                rows: rows.len(),
                fill: std::mem::take(&mut fill),
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            info!(
                "flushed bucket {} rows={} missing={} filled={} backfill_failures={} in {}ms",
                report.bucket_start,
                report.rows,
                report.fill.missing,
                report.fill.filled,
                report.fill.failures,
                report.elapsed_ms
            );
            reports.push(report);
        }
        Ok(reports)
    }
}
