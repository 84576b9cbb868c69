//! The derived mid-price observation, the unit of data that flows through
//! the whole pipeline: poller batch -> service -> notifier/db pools.

use serde::{Deserialize, Serialize};

/// A single symbol's derived mid-price at one epoch second.
///
/// `time` is assigned once per poll batch — every point produced from the
/// same tick shares the same `time` value (spec invariant I4/P7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    /// Asset id from the symbol table.
    #[serde(rename = "assetId")]
    pub asset_id: u32,
    /// Asset name as it appeared on the wire (equal to the symbol table entry).
    #[serde(rename = "assetName")]
    pub asset_name: String,
    /// Epoch seconds at which the owning poll batch was taken.
    pub time: i64,
    /// Mid price: `(ask + bid) / 2`, plain `f64` arithmetic, no rounding.
    pub value: f64,
}

impl RatePoint {
    /// Derive a rate point from an admitted quote's ask/bid and the batch timestamp.
    #[must_use]
    pub fn from_quote(asset_id: u32, asset_name: String, time: i64, ask: f64, bid: f64) -> Self {
        Self {
            asset_id,
            asset_name,
            time,
            value: (ask + bid) / 2.0,
        }
    }
}
