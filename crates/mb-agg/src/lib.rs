//! Minute-bucket aggregation core.
//!
//! Feeds write into the [`StateStore`]. Once per minute the
//! [`BucketScheduler`] asks the [`Aggregator`] to flush, which copies the
//! rolling state, turns it into one row per instrument, fills missing fields
//! through a [`Backfill`](backfill::Backfill) capability and hands the batch to a
//! [`StorageSink`](sink::StorageSink).

pub mod aggregator;
pub mod backfill;
pub mod extractor;
pub mod gap_filler;
pub mod scheduler;
pub mod sink;
pub mod store;

pub use aggregator::{Aggregator, FlushReport};
pub use gap_filler::{FillReport, GapFiller};
pub use scheduler::BucketScheduler;
pub use store::StateStore;
