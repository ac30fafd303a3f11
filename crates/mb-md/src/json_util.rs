//! Shared JSON parsing helpers used by all exchange parsers.

use mb_core::Level;
use mb_core::json_util::{parse_f64, parse_level};

/// Parse a JSON value (string or number) as a finite `f64`.
///
/// Exchanges encode numerics either as JSON strings (`"30000.5"`) or native
/// numbers (`30000.5`).
#[inline]
pub fn parse_str_f64(v: Option<&serde_json::Value>) -> Option<f64> {
    parse_f64(v?)
}

/// Parse a JSON value (string or number) as `u64`.
#[inline]
pub fn parse_str_u64(v: Option<&serde_json::Value>) -> Option<u64> {
    let v = v?;
    if let Some(s) = v.as_str() { s.parse().ok() } else { v.as_u64() }
}

/// Parse a named field on a JSON object as `f64` (string or number).
#[inline]
pub fn parse_f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    parse_str_f64(v.get(key))
}

/// Parse a `[["price", "amount", ...], ...]` array into levels.
///
/// A missing side is empty. `None` if the side is not an array or any level
/// fails to parse, so a damaged best level never lets a deeper one take its
/// place.
pub fn parse_levels(v: Option<&serde_json::Value>) -> Option<Vec<Level>> {
    let Some(v) = v else {
        return Some(Vec::new());
    };
    v.as_array()?.iter().map(parse_level).collect()
}
