//! Acceleration Tables
//!
//! Kensington-style threshold/multiplier lookup. A delta is matched to the
//! nearest threshold (ties resolve to the smaller index) and scaled by the
//! paired multiplier.

use crate::types::AccelPreset;
use thiserror::Error;

/// Shared threshold row for all presets.
pub const PRESET_THRESHOLDS: [i32; 12] = [1, 2, 3, 5, 7, 10, 14, 20, 30, 43, 63, 91];

const M5: [f64; 12] = [1.0, 1.3, 1.7, 2.0, 2.4, 2.7, 3.1, 3.4, 3.8, 4.1, 4.5, 4.8];
const M6: [f64; 12] = [1.2, 1.6, 2.0, 2.4, 2.8, 3.3, 3.7, 4.1, 4.5, 4.9, 5.4, 5.8];
const M7: [f64; 12] = [1.4, 1.8, 2.3, 2.8, 3.3, 3.8, 4.3, 4.8, 5.3, 5.8, 6.3, 6.7];
const M8: [f64; 12] = [1.6, 2.1, 2.7, 3.2, 3.8, 4.4, 4.9, 5.5, 6.0, 6.6, 7.2, 7.7];
const M9: [f64; 12] = [1.8, 2.4, 3.0, 3.6, 4.3, 4.9, 5.5, 6.2, 6.8, 7.4, 8.1, 8.7];

/// Maximum entries accepted in a custom table.
pub const MAX_TABLE_LEN: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum AccelTableError {
    #[error("threshold and multiplier counts differ ({thresholds} vs {multipliers})")]
    LengthMismatch { thresholds: usize, multipliers: usize },
    #[error("table length {0} outside the supported range")]
    BadLength(usize),
    #[error("thresholds must be positive and strictly ascending")]
    BadThresholds,
    #[error("multipliers must be positive")]
    BadMultipliers,
    #[error("unparsable entry {0:?}")]
    BadEntry(String),
}

/// Validated threshold/multiplier pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AccelTable {
    thresholds: Vec<i32>,
    multipliers: Vec<f64>,
}

impl AccelTable {
    pub fn new(thresholds: Vec<i32>, multipliers: Vec<f64>) -> Result<Self, AccelTableError> {
        if thresholds.len() != multipliers.len() {
            return Err(AccelTableError::LengthMismatch {
                thresholds: thresholds.len(),
                multipliers: multipliers.len(),
            });
        }
        if thresholds.is_empty() || thresholds.len() > MAX_TABLE_LEN {
            return Err(AccelTableError::BadLength(thresholds.len()));
        }
        if thresholds[0] <= 0 || thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AccelTableError::BadThresholds);
        }
        if multipliers.iter().any(|&m| m <= 0.0) {
            return Err(AccelTableError::BadMultipliers);
        }
        Ok(AccelTable {
            thresholds,
            multipliers,
        })
    }

    /// The fixed table for a preset.
    pub fn preset(p: AccelPreset) -> AccelTable {
        let multipliers = match p {
            AccelPreset::M5 => M5,
            AccelPreset::M6 => M6,
            AccelPreset::M7 => M7,
            AccelPreset::M8 => M8,
            AccelPreset::M9 => M9,
        };
        AccelTable {
            thresholds: PRESET_THRESHOLDS.to_vec(),
            multipliers: multipliers.to_vec(),
        }
    }

    /// Index of the threshold nearest to `|d|`; ties go to the smaller index.
    fn nearest_index(&self, d: i32) -> usize {
        let ad = d.abs();
        for (i, &t) in self.thresholds.iter().enumerate() {
            if t == ad {
                return i;
            }
            if t > ad {
                if i == 0 {
                    return 0;
                }
                return if t - ad < (self.thresholds[i - 1] - ad).abs() {
                    i
                } else {
                    i - 1
                };
            }
        }
        self.thresholds.len() - 1
    }

    /// Scale a delta by the multiplier of its nearest threshold.
    pub fn apply(&self, d: i32) -> i32 {
        if d == 0 {
            return 0;
        }
        let m = self.multipliers[self.nearest_index(d)];
        (d as f64 * m).round() as i32
    }

    pub fn thresholds(&self) -> &[i32] {
        &self.thresholds
    }

    pub fn multipliers(&self) -> &[f64] {
        &self.multipliers
    }
}

/// Parse a comma-separated threshold list from a profile value.
pub fn parse_thresholds(s: &str) -> Result<Vec<i32>, AccelTableError> {
    s.split(',')
        .map(|tok| {
            let tok = tok.trim();
            tok.parse::<i32>()
                .map_err(|_| AccelTableError::BadEntry(tok.to_string()))
        })
        .collect()
}

/// Parse a comma-separated multiplier list from a profile value.
pub fn parse_multipliers(s: &str) -> Result<Vec<f64>, AccelTableError> {
    s.split(',')
        .map(|tok| {
            let tok = tok.trim();
            tok.parse::<f64>()
                .map_err(|_| AccelTableError::BadEntry(tok.to_string()))
        })
        .collect()
}

/// Serialize a threshold list back to the profile form.
pub fn serialize_thresholds(v: &[i32]) -> String {
    v.iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Serialize a multiplier list back to the profile form.
pub fn serialize_multipliers(v: &[f64]) -> String {
    v.iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
