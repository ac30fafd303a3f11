//! Time utilities: wall-clock timestamps, bucket alignment, and the
//! injectable [`Clock`] used by the bucket scheduler.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Width of one aggregation bucket in seconds.
pub const BUCKET_SECS: i64 = 60;

/// Align a unix timestamp (seconds) to the start of its minute bucket.
///
/// `minute_bucket(t) == floor(t / 60) * 60`, and applying it twice yields the
/// same value.
#[inline]
pub fn minute_bucket(unix_secs: i64) -> i64 {
    unix_secs.div_euclid(BUCKET_SECS) * BUCKET_SECS
}

/// Current time as **seconds** since Unix epoch.
#[inline]
pub fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or_default()
}

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Clock abstraction
// ---------------------------------------------------------------------------

/// Source of "now" for the scheduler.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now_secs(&self) -> i64;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        now_secs()
    }
}

/// A clock that only moves when told to. Lets tests walk the scheduler across
/// bucket boundaries without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    pub fn new(start_secs: i64) -> Self {
        Self { secs: AtomicI64::new(start_secs) }
    }

    pub fn set(&self, secs: i64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> i64 {
        self.secs.load(Ordering::SeqCst)
    }
}
