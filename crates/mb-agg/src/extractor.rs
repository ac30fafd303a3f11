//! Snapshot extraction: rolling state → one row per tracked instrument.

use ahash::AHashMap;
use mb_core::{InstrumentKey, LiveState, MinuteSnapshot};

/// Turn a state copy into one [`MinuteSnapshot`] per instrument, tagged with
/// `bucket_start`.
///
/// Instruments that never received an event still get an all-empty row, so
/// storage records the silence. Rows come out sorted by `(exchange, symbol)`.
pub fn extract(bucket_start: i64, state: &AHashMap<InstrumentKey, LiveState>) -> Vec<MinuteSnapshot> {
    let mut rows: Vec<MinuteSnapshot> =
        state.iter().map(|(key, live)| MinuteSnapshot::from_state(bucket_start, key.clone(), live)).collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}
