//! Bucket scheduler: watches the clock and triggers flushes on minute
//! boundaries.
//!
//! Each tick compares `minute_bucket(now)` with the bucket seen on the
//! previous tick. When a boundary has passed, the bucket that was open is
//! flushed and the new one becomes current.
//!
//! If the loop stalls across several boundaries, [`SkippedBucketPolicy`]
//! decides what happens to the buckets in between:
//!
//! - `Drop` (default): one flush, tagged with the bucket that was open before
//!   the stall. The intermediate minutes get no row.
//! - `Replay`: one flush per closed bucket, oldest first, all built from a
//!   single state copy taken on that tick.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mb_core::SkippedBucketPolicy;
use mb_core::time_util::{BUCKET_SECS, Clock, minute_bucket};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::aggregator::{Aggregator, FlushReport};

pub struct BucketScheduler {
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    policy: SkippedBucketPolicy,
    last_bucket: i64,
}

impl BucketScheduler {
    /// The bucket containing `clock`'s current time becomes the open bucket.
    pub fn new(clock: Arc<dyn Clock>, tick_interval: Duration, policy: SkippedBucketPolicy) -> Self {
        let last_bucket = minute_bucket(clock.now_secs());
        Self { clock, tick_interval, policy, last_bucket }
    }

    pub fn last_bucket(&self) -> i64 {
        self.last_bucket
    }

    /// Check the clock and return the buckets to flush, oldest first. Empty
    /// while the open bucket has not closed yet. A clock that went backwards
    /// is ignored, so flushed buckets never decrease.
    pub fn advance(&mut self) -> Vec<i64> {
        let current = minute_bucket(self.clock.now_secs());
        if current <= self.last_bucket {
            return Vec::new();
        }

        let closed = (current - self.last_bucket) / BUCKET_SECS;
        let due = match self.policy {
            SkippedBucketPolicy::Drop => {
                if closed > 1 {
                    warn!("{} bucket(s) skipped before {current}, flushing {} only", closed - 1, self.last_bucket);
                }
                vec![self.last_bucket]
            }
            SkippedBucketPolicy::Replay => (0..closed).map(|i| self.last_bucket + i * BUCKET_SECS).collect(),
        };
        self.last_bucket = current;
        due
    }

    /// One clock check and, if a boundary passed, the matching flush(es).
    pub async fn tick(&mut self, aggregator: &Aggregator) -> Result<Vec<FlushReport>> {
        let due = self.advance();
        if due.is_empty() {
            return Ok(Vec::new());
        }
        aggregator.flush_many(&due).await
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// A flush that has started always finishes before the loop exits. A
    /// storage error ends the loop and is returned.
    pub async fn run(mut self, aggregator: Arc<Aggregator>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("scheduler started, open bucket {} ({:?})", self.last_bucket, self.policy);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(&aggregator).await?;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("scheduler stopped at bucket {}", self.last_bucket);
        Ok(())
    }
}
