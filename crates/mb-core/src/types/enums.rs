//! Enumerations used throughout the service.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MbError;

// ---------------------------------------------------------------------------
// Exchange identifiers
// ---------------------------------------------------------------------------

/// Supported cryptocurrency exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Binance,
    Okx,
}

impl Exchange {
    /// Lowercase identifier used in storage rows and file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Okx => "okx",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = MbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "okx" => Ok(Self::Okx),
            other => Err(MbError::UnknownExchange(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// How concurrent updates to the same field are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Whichever update acquires the store lock last wins. Event timestamps
    /// are ignored.
    #[default]
    LastWriterWins,
    /// An update older (by event timestamp) than the one already applied to
    /// the same field is discarded. A zero timestamp means "unknown" and
    /// always applies.
    EventTime,
}

/// What the scheduler does when a tick finds more than one closed bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkippedBucketPolicy {
    /// Flush once, tagged with the last bucket the scheduler observed.
    /// Intermediate buckets leave no row.
    #[default]
    Drop,
    /// Flush every closed bucket in order, each from the same rolling-state
    /// copy.
    Replay,
}
