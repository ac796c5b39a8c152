//! Body-composition measurement recorded by the local scale app.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped measurement.
///
/// Owned by the caller; sync backends only read it. Percentages are stored
/// as plain numbers (`21.5` means 21.5 %).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub weight: f32,
    #[serde(default)]
    pub fat: f32,
    #[serde(default)]
    pub water: f32,
    #[serde(default)]
    pub muscle: f32,
}

impl Measurement {
    /// Measurement with only a weight; the composition values stay at zero.
    pub fn with_weight(timestamp: DateTime<Utc>, weight: f32) -> Self {
        Self {
            timestamp,
            weight,
            fat: 0.0,
            water: 0.0,
            muscle: 0.0,
        }
    }
}
