//! Number parsing shared by the feed parsers and the REST backfill.

use serde_json::Value;

use crate::types::Level;

/// Parse a JSON string (`"30000.5"`) or number (`30000.5`) as a finite `f64`.
#[inline]
pub fn parse_f64(v: &Value) -> Option<f64> {
    let parsed = if let Some(s) = v.as_str() { fast_float2::parse(s).ok() } else { v.as_f64() };
    parsed.filter(|x: &f64| x.is_finite())
}

/// Parse one `["price", "amount", ...]` book level. Extra trailing fields are
/// ignored.
pub fn parse_level(v: &Value) -> Option<Level> {
    let a = v.as_array()?;
    Some(Level::new(parse_f64(a.first()?)?, parse_f64(a.get(1)?)?))
}
