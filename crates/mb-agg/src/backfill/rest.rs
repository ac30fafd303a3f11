//! REST backfill against the exchanges' public market endpoints.
//!
//! | Exchange | Last price                          | Top of book                                |
//! |----------|-------------------------------------|--------------------------------------------|
//! | Binance  | `GET /api/v3/ticker/price?symbol=`  | `GET /api/v3/depth?symbol=&limit=`         |
//! | OKX      | `GET /api/v5/market/ticker?instId=` | `GET /api/v5/market/books?instId=&sz=`     |
//!
//! Each request is bounded by the client's connect and total timeouts, so a
//! dead endpoint costs at most one timeout per field per flush.

use async_trait::async_trait;
use mb_core::config::BackfillConfig;
use mb_core::json_util::{parse_f64, parse_level};
use mb_core::{Exchange, Level};
use serde_json::Value;
use tracing::debug;

use super::{Backfill, BackfillError, TopOfBook};

/// Binance / OKX public REST client.
pub struct RestBackfill {
    http: reqwest::Client,
    binance_url: String,
    okx_url: String,
}

impl RestBackfill {
    /// Build a client with the configured timeouts and base URLs.
    pub fn new(cfg: &BackfillConfig) -> Result<Self, BackfillError> {
        let http = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self {
            http,
            binance_url: cfg.binance_rest_url.trim_end_matches('/').to_string(),
            okx_url: cfg.okx_rest_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, BackfillError> {
        debug!("backfill GET {url} {query:?}");
        let resp = self.http.get(url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackfillError::Status(status.as_u16()));
        }
        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl Backfill for RestBackfill {
    async fn fetch_last_price(&self, exchange: Exchange, symbol: &str) -> Result<Option<f64>, BackfillError> {
        match exchange {
            Exchange::Binance => {
                let url = format!("{}/api/v3/ticker/price", self.binance_url);
                parse_binance_price(&self.get_json(&url, &[("symbol", symbol)]).await?)
            }
            Exchange::Okx => {
                let url = format!("{}/api/v5/market/ticker", self.okx_url);
                parse_okx_price(&self.get_json(&url, &[("instId", symbol)]).await?)
            }
        }
    }

    async fn fetch_top_of_book(
        &self,
        exchange: Exchange,
        symbol: &str,
        depth: u32,
    ) -> Result<TopOfBook, BackfillError> {
        let depth = depth.to_string();
        match exchange {
            Exchange::Binance => {
                let url = format!("{}/api/v3/depth", self.binance_url);
                parse_binance_book(&self.get_json(&url, &[("symbol", symbol), ("limit", &depth)]).await?)
            }
            Exchange::Okx => {
                let url = format!("{}/api/v5/market/books", self.okx_url);
                parse_okx_book(&self.get_json(&url, &[("instId", symbol), ("sz", &depth)]).await?)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response parsers
// ---------------------------------------------------------------------------

/// `{"symbol": "BTCUSDT", "price": "50000.00"}`
pub fn parse_binance_price(body: &Value) -> Result<Option<f64>, BackfillError> {
    let raw = body.get("price").ok_or_else(|| BackfillError::Malformed("missing price".into()))?;
    parse_f64(raw).map(Some).ok_or_else(|| BackfillError::Malformed(format!("bad price {raw}")))
}

/// `{"lastUpdateId": 1, "bids": [["p", "q"], ...], "asks": [...]}`
pub fn parse_binance_book(body: &Value) -> Result<TopOfBook, BackfillError> {
    if body.get("bids").is_none() && body.get("asks").is_none() {
        return Err(BackfillError::Malformed("missing bids and asks".into()));
    }
    Ok(TopOfBook { bid: first_level(body.get("bids")), ask: first_level(body.get("asks")) })
}

/// `{"code": "0", "data": [{"instId": "BTC-USDT", "last": "50000.1", ...}]}`
pub fn parse_okx_price(body: &Value) -> Result<Option<f64>, BackfillError> {
    let Some(entry) = okx_data(body)? else {
        return Ok(None);
    };
    let raw = entry.get("last").ok_or_else(|| BackfillError::Malformed("missing last".into()))?;
    parse_f64(raw).map(Some).ok_or_else(|| BackfillError::Malformed(format!("bad last {raw}")))
}

/// `{"code": "0", "data": [{"bids": [["p", "q", "0", "n"]], "asks": [...], "ts": "..."}]}`
pub fn parse_okx_book(body: &Value) -> Result<TopOfBook, BackfillError> {
    let Some(entry) = okx_data(body)? else {
        return Ok(TopOfBook::default());
    };
    Ok(TopOfBook { bid: first_level(entry.get("bids")), ask: first_level(entry.get("asks")) })
}

/// First element of OKX's `data` array after checking the envelope `code`.
fn okx_data(body: &Value) -> Result<Option<&Value>, BackfillError> {
    match body.get("code").and_then(Value::as_str) {
        Some("0") | None => {}
        Some(code) => {
            let msg = body.get("msg").and_then(Value::as_str).unwrap_or("");
            return Err(BackfillError::Malformed(format!("okx code {code}: {msg}")));
        }
    }
    let data =
        body.get("data").and_then(Value::as_array).ok_or_else(|| BackfillError::Malformed("missing data".into()))?;
    Ok(data.first())
}

fn first_level(side: Option<&Value>) -> Option<Level> {
    parse_level(side?.as_array()?.first()?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> RestBackfill {
        let cfg = BackfillConfig {
            binance_rest_url: server.uri(),
            okx_rest_url: format!("{}/", server.uri()),
            timeout_ms: 1_000,
            connect_timeout_ms: 500,
            ..Default::default()
        };
        RestBackfill::new(&cfg).unwrap()
    }

    #[test]
    fn binance_parsers() {
        assert_eq!(parse_binance_price(&json!({"symbol": "BTCUSDT", "price": "42.5"})).unwrap(), Some(42.5));
        assert!(parse_binance_price(&json!({"code": -1121, "msg": "Invalid symbol."})).is_err());

        let book = parse_binance_book(&json!({"lastUpdateId": 1, "bids": [["100.0", "1.5"]], "asks": []})).unwrap();
        assert_eq!(book.bid, Some(Level::new(100.0, 1.5)));
        assert_eq!(book.ask, None);
    }

    #[test]
    fn okx_parsers() {
        let body = json!({"code": "0", "msg": "", "data": [{"last": "30000.1"}]});
        assert_eq!(parse_okx_price(&body).unwrap(), Some(30000.1));
        assert_eq!(parse_okx_price(&json!({"code": "0", "data": []})).unwrap(), None);
        assert!(parse_okx_price(&json!({"code": "51001", "msg": "Instrument ID does not exist", "data": []})).is_err());

        let book = parse_okx_book(&json!({
            "code": "0",
            "data": [{"bids": [["29999.9", "0.3", "0", "2"]], "asks": [["30000.1", "0.5", "0", "3"]], "ts": "1"}]
        }))
        .unwrap();
        assert_eq!(book.bid, Some(Level::new(29999.9, 0.3)));
        assert_eq!(book.ask, Some(Level::new(30000.1, 0.5)));
        assert!(parse_okx_book(&json!({"code": "0", "data": []})).unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetches_binance_price_and_book() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .and(query_param("symbol", "BTCUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"symbol": "BTCUSDT", "price": "42.00"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/depth"))
            .and(query_param("symbol", "BTCUSDT"))
            .and(query_param("limit", "5"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"lastUpdateId": 9, "bids": [["41.9", "2"]], "asks": [["42.1", "3"]]})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.fetch_last_price(Exchange::Binance, "BTCUSDT").await.unwrap(), Some(42.0));
        let book = client.fetch_top_of_book(Exchange::Binance, "BTCUSDT", 5).await.unwrap();
        assert_eq!(book.bid, Some(Level::new(41.9, 2.0)));
        assert_eq!(book.ask, Some(Level::new(42.1, 3.0)));
    }

    #[tokio::test]
    async fn fetches_okx_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v5/market/ticker"))
            .and(query_param("instId", "BTC-USDT"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": "0", "msg": "", "data": [{"last": "30000.5"}]})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.fetch_last_price(Exchange::Okx, "BTC-USDT").await.unwrap(), Some(30000.5));
    }

    #[tokio::test]
    async fn error_status_and_bad_body_are_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v5/market/books"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.fetch_last_price(Exchange::Binance, "BTCUSDT").await,
            Err(BackfillError::Status(500))
        ));
        assert!(matches!(
            client.fetch_top_of_book(Exchange::Okx, "BTC-USDT", 5).await,
            Err(BackfillError::Http(_))
        ));
    }

    #[tokio::test]
    async fn slow_endpoint_hits_the_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"price": "1"}))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_last_price(Exchange::Binance, "BTCUSDT").await.unwrap_err();
        match err {
            BackfillError::Http(e) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
