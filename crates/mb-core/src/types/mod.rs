//! Core data types flowing through the service.
//!
//! Feed adapters produce [`FeedEvent`]s, the state store folds them into
//! [`LiveState`], and every flush turns that state into [`MinuteSnapshot`] rows.

pub mod enums;
pub mod instrument;
pub mod market_data;
pub mod snapshot;

pub use enums::*;
pub use instrument::*;
pub use market_data::*;
pub use snapshot::*;
