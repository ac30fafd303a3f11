//! Storage sinks for flushed snapshot rows.
//!
//! | Backend  | Layout                                                 |
//! |----------|--------------------------------------------------------|
//! | CSV      | `{dir}/{exchange}_{symbol}.csv`, one row per bucket    |
//! | Postgres | `minute_snapshots`, keyed by `(bucket_start, exchange, symbol)` |
//!
//! Both upsert on the row identity, render missing values as empty / `NULL`
//! and never as a sentinel number.

pub mod csv;
pub mod postgres;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mb_core::MinuteSnapshot;
use mb_core::config::StorageConfig;
use tracing::info;

pub use self::csv::CsvSink;
pub use self::postgres::PostgresSink;

/// Column order shared by every backend.
pub const COLUMNS: [&str; 8] = [
    "bucket_start",
    "exchange",
    "symbol",
    "last_price",
    "best_bid_price",
    "best_bid_amount",
    "best_ask_price",
    "best_ask_amount",
];

#[async_trait]
pub trait StorageSink: Send + Sync {
    fn name(&self) -> &str;

    /// Create whatever the backend needs. Calling it again changes nothing.
    async fn ensure_schema(&self) -> Result<()>;

    /// Upsert `rows`. An empty slice is a no-op.
    async fn write_batch(&self, rows: &[MinuteSnapshot]) -> Result<()>;
}

/// Build the sink selected by `cfg`. Postgres connects here.
pub async fn create_sink(cfg: &StorageConfig) -> Result<Arc<dyn StorageSink>> {
    let sink: Arc<dyn StorageSink> = match cfg {
        StorageConfig::Csv { dir } => Arc::new(CsvSink::new(dir)),
        StorageConfig::Postgres { dsn } => Arc::new(PostgresSink::connect(dsn).await?),
    };
    info!("storage sink: {}", sink.name());
    Ok(sink)
}

/// Optional number as a CSV cell: empty when absent.
pub(crate) fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
