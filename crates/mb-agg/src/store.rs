//! Concurrent per-instrument state store.
//!
//! The only shared mutable structure in the service. Feed connection tasks
//! call [`StateStore::apply_tick`] / [`StateStore::apply_orderbook`]
//! concurrently; the scheduler calls [`StateStore::read_all`] once per flush.
//!
//! # Locking
//!
//! One `std::sync::Mutex` guards the whole map. It is held for exactly one
//! operation and never across an `.await`, a network call, or disk I/O. The
//! instrument set is fixed at construction, so the map never grows.

use std::sync::{Mutex, MutexGuard};

use ahash::AHashMap;
use mb_core::{FeedEvent, InstrumentKey, Level, LiveState, OrderingPolicy};
use tracing::debug;

pub struct StateStore {
    inner: Mutex<AHashMap<InstrumentKey, LiveState>>,
    policy: OrderingPolicy,
}

impl StateStore {
    /// Create a store tracking exactly `keys`, every field empty.
    pub fn new(keys: impl IntoIterator<Item = InstrumentKey>, policy: OrderingPolicy) -> Self {
        let map = keys.into_iter().map(|k| (k, LiveState::default())).collect();
        Self { inner: Mutex::new(map), policy }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &InstrumentKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Record a trade price. Returns `false` if the instrument is not tracked
    /// or the update lost to a newer one under [`OrderingPolicy::EventTime`].
    pub fn apply_tick(&self, key: &InstrumentKey, price: f64, timestamp_ms: u64) -> bool {
        let policy = self.policy;
        let mut map = self.lock();
        let Some(state) = map.get_mut(key) else {
            debug!("tick for untracked instrument {key} dropped");
            return false;
        };
        if !accepts(policy, state.trade_ts_ms, timestamp_ms) {
            return false;
        }
        state.last_trade_price = Some(price);
        state.trade_ts_ms = Some(timestamp_ms);
        true
    }

    /// Record the top of an order book update. An empty side leaves the
    /// corresponding field untouched. Returns `true` if any field changed.
    pub fn apply_orderbook(&self, key: &InstrumentKey, bids: &[Level], asks: &[Level], timestamp_ms: u64) -> bool {
        let policy = self.policy;
        let mut map = self.lock();
        let Some(state) = map.get_mut(key) else {
            debug!("order book for untracked instrument {key} dropped");
            return false;
        };

        let mut changed = false;
        if let Some(best) = bids.first() {
            if accepts(policy, state.bid_ts_ms, timestamp_ms) {
                state.best_bid = Some(*best);
                state.bid_ts_ms = Some(timestamp_ms);
                changed = true;
            }
        }
        if let Some(best) = asks.first() {
            if accepts(policy, state.ask_ts_ms, timestamp_ms) {
                state.best_ask = Some(*best);
                state.ask_ts_ms = Some(timestamp_ms);
                changed = true;
            }
        }
        changed
    }

    /// Dispatch a feed event to the matching `apply_*` operation.
    pub fn apply(&self, event: &FeedEvent) -> bool {
        let key = event.key();
        match event {
            FeedEvent::Tick(t) => self.apply_tick(&key, t.price, t.timestamp_ms),
            FeedEvent::OrderBook(o) => self.apply_orderbook(&key, &o.bids, &o.asks, o.timestamp_ms),
        }
    }

    /// Copy of every tracked instrument's state.
    pub fn read_all(&self) -> AHashMap<InstrumentKey, LiveState> {
        self.lock().clone()
    }

    /// A poisoned lock only means a writer panicked between two independent
    /// field writes; every field is still a value some event carried.
    fn lock(&self) -> MutexGuard<'_, AHashMap<InstrumentKey, LiveState>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Whether an update stamped `incoming` may replace a field last set at `current`.
#[inline]
fn accepts(policy: OrderingPolicy, current: Option<u64>, incoming: u64) -> bool {
    match (policy, current) {
        (OrderingPolicy::LastWriterWins, _) => true,
        (OrderingPolicy::EventTime, None) => true,
        (OrderingPolicy::EventTime, Some(_)) if incoming == 0 => true,
        (OrderingPolicy::EventTime, Some(current)) => incoming >= current,
    }
}
