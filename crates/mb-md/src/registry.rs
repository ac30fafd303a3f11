//! Feed registry: factory for creating feeds from config.

use anyhow::Result;
use mb_core::{Exchange, config::FeedsConfig};

use crate::{EventCallback, FeedSource, pipeline::GenericFeed};

/// Create a [`FeedSource`] for one exchange.
///
/// See [`build_feed`].
pub fn create_feed(
    exchange: Exchange,
    symbols: &[String],
    feeds: &FeedsConfig,
    on_event: EventCallback,
) -> Result<Box<dyn FeedSource>> {
    Ok(Box::new(build_feed(exchange, symbols, feeds, on_event)?))
}

/// The exchange module's `build()` produces `StreamDef`s that are fed into
/// [`GenericFeed`]. Every parsed event is handed to `on_event`.
pub fn build_feed(
    exchange: Exchange,
    symbols: &[String],
    feeds: &FeedsConfig,
    on_event: EventCallback,
) -> Result<GenericFeed> {
    let streams = match exchange {
        Exchange::Binance => crate::binance::build(symbols, feeds)?,
        Exchange::Okx => crate::okx::build(symbols, feeds)?,
    };

    Ok(GenericFeed::new(format!("{exchange}_md"), streams, on_event).with_connect_timeout(feeds.connect_timeout()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn creates_named_feeds() {
        let cb: EventCallback = Arc::new(|_| {});
        let feed = create_feed(Exchange::Binance, &["BTCUSDT".into()], &FeedsConfig::default(), cb.clone()).unwrap();
        assert_eq!(feed.name(), "binance_md");
        let feed = create_feed(Exchange::Okx, &["BTC-USDT".into()], &FeedsConfig::default(), cb).unwrap();
        assert_eq!(feed.name(), "okx_md");
    }

    #[test]
    fn feeds_use_the_configured_connect_timeout() {
        let feeds = FeedsConfig { connect_timeout_ms: 1_500, ..Default::default() };
        let feed = build_feed(Exchange::Okx, &["BTC-USDT".into()], &feeds, Arc::new(|_| {})).unwrap();
        assert_eq!(feed.connect_timeout(), Duration::from_millis(1_500));
        assert_eq!(feed.stream_count(), 1);
    }
}
