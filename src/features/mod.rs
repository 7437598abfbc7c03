//! Keystroke-timing feature extraction.

mod pipeline;
mod timing;

pub use pipeline::{ExtractedFeatures, FeatureExtractor, FeatureSummary};
pub use timing::TimingSeries;

use serde::{Deserialize, Serialize};

/// Number of values in every feature vector.
pub const FEATURE_LEN: usize = 36;

/// Bumped whenever the meaning or order of the vector changes.
pub const FEATURE_LAYOUT_VERSION: u32 = 1;

/// One key press/release as captured by the client. Times are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeystrokeEvent {
    pub key: String,
    pub press_time: f64,
    pub release_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touch_size: Option<f64>,
}

impl KeystrokeEvent {
    pub fn new(key: impl Into<String>, press_time: f64, release_time: f64) -> Self {
        Self {
            key: key.into(),
            press_time,
            release_time,
            pressure: None,
            touch_size: None,
        }
    }

    pub fn with_touch(mut self, pressure: f64, touch_size: f64) -> Self {
        self.pressure = Some(pressure);
        self.touch_size = Some(touch_size);
        self
    }
}

/// Fixed-layout feature vector:
/// `[dwell×7, flight×7, digraph×7, typing_speed, pressure×7, touch×7]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn typing_speed(&self) -> f64 {
        self.values[3 * crate::stats::Statistics::LEN]
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        if values.len() != FEATURE_LEN {
            return Err(format!(
                "feature vector has {} values, expected {}",
                values.len(),
                FEATURE_LEN
            ));
        }
        Ok(Self { values })
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(v: FeatureVector) -> Self {
        v.values
    }
}
