use anyhow::{Context, Result};
use async_trait::async_trait;
use mb_core::MinuteSnapshot;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

use super::StorageSink;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS minute_snapshots (
    bucket_start    BIGINT           NOT NULL,
    exchange        TEXT             NOT NULL,
    symbol          TEXT             NOT NULL,
    last_price      DOUBLE PRECISION,
    best_bid_price  DOUBLE PRECISION,
    best_bid_amount DOUBLE PRECISION,
    best_ask_price  DOUBLE PRECISION,
    best_ask_amount DOUBLE PRECISION,
    PRIMARY KEY (bucket_start, exchange, symbol)
)";

const UPSERT: &str = "INSERT INTO minute_snapshots (
    bucket_start, exchange, symbol,
    last_price, best_bid_price, best_bid_amount, best_ask_price, best_ask_amount
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (bucket_start, exchange, symbol) DO UPDATE SET
    last_price      = EXCLUDED.last_price,
    best_bid_price  = EXCLUDED.best_bid_price,
    best_bid_amount = EXCLUDED.best_bid_amount,
    best_ask_price  = EXCLUDED.best_ask_price,
    best_ask_amount = EXCLUDED.best_ask_amount";

/// Upserts rows into `minute_snapshots`. One batch is one transaction.
pub struct PostgresSink {
    client: Mutex<Client>,
}

impl PostgresSink {
    /// Connect and spawn the connection driver task.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(dsn, NoTls).await.context("connecting to postgres")?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection closed: {e}");
            }
        });
        info!("connected to postgres");
        Ok(Self { client: Mutex::new(client) })
    }
}

#[async_trait]
impl StorageSink for PostgresSink {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn ensure_schema(&self) -> Result<()> {
        let client = self.client.lock().await;
        client.batch_execute(CREATE_TABLE).await.context("creating minute_snapshots")?;
        Ok(())
    }

    async fn write_batch(&self, rows: &[MinuteSnapshot]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut client = self.client.lock().await;
        let tx = client.transaction().await.context("beginning transaction")?;
        let stmt = tx.prepare(UPSERT).await.context("preparing upsert")?;
        for row in rows {
            let exchange = row.key.exchange.as_str();
            tx.execute(
                &stmt,
                &[
                    &row.bucket_start,
                    &exchange,
                    &row.key.symbol,
                    &row.last_price,
                    &row.best_bid_price(),
                    &row.best_bid_amount(),
                    &row.best_ask_price(),
                    &row.best_ask_amount(),
                ],
            )
            .await
            .with_context(|| format!("upserting {row}"))?;
        }
        tx.commit().await.context("committing batch")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mb_core::{Exchange, InstrumentKey, Level};

    use super::*;

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        assert!(PostgresSink::connect("host=127.0.0.1 port=1 user=nobody connect_timeout=2").await.is_err());
    }

    /// Runs only when `MB_TEST_POSTGRES_DSN` points at a scratch database.
    #[tokio::test]
    async fn upsert_against_live_database() {
        let Ok(dsn) = std::env::var("MB_TEST_POSTGRES_DSN") else {
            return;
        };
        let sink = PostgresSink::connect(&dsn).await.unwrap();
        sink.ensure_schema().await.unwrap();
        sink.ensure_schema().await.unwrap();

        let key = InstrumentKey::new(Exchange::Binance, "MBTESTUSDT");
        let mut row = MinuteSnapshot { bucket_start: 60, key, last_price: None, best_bid: None, best_ask: None };
        sink.write_batch(&[row.clone()]).await.unwrap();
        row.last_price = Some(42.0);
        row.best_bid = Some(Level::new(41.0, 1.0));
        sink.write_batch(&[row]).await.unwrap();

        let client = sink.client.lock().await;
        let found = client
            .query_one(
                "SELECT last_price, best_bid_price, best_ask_price FROM minute_snapshots \
                 WHERE bucket_start = 60 AND exchange = 'binance' AND symbol = 'MBTESTUSDT'",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(found.get::<_, Option<f64>>(0), Some(42.0));
        assert_eq!(found.get::<_, Option<f64>>(1), Some(41.0));
        assert_eq!(found.get::<_, Option<f64>>(2), None);
        client.execute("DELETE FROM minute_snapshots WHERE symbol = 'MBTESTUSDT'", &[]).await.unwrap();
    }
}
