//! One-class anomaly detection seam and the raw-score → confidence calibration.

use super::envelope::Envelope;
use super::forest::IsolationForest;
use crate::config::{DetectorKind, ModelConfig};
use serde::{Deserialize, Serialize};

/// Density or ensemble method trained only on genuine samples.
pub trait AnomalyDetector {
    /// Fit on standardized enrollment rows.
    fn fit(&mut self, rows: &[Vec<f64>]);

    /// Raw typicality: higher is more normal, 0 sits on the fitted boundary.
    fn score(&self, row: &[f64]) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detector {
    Envelope(Envelope),
    IsolationForest(IsolationForest),
}

impl Detector {
    /// Unfitted detector of the configured kind.
    pub fn from_config(config: &ModelConfig) -> Self {
        match config.detector {
            DetectorKind::Envelope => Detector::Envelope(Envelope::new(
                config.envelope_tolerance,
                config.envelope_min_radius,
                config.envelope_trim,
            )),
            DetectorKind::IsolationForest => Detector::IsolationForest(IsolationForest::new(
                config.n_estimators,
                config.max_samples,
                config.contamination,
                config.seed,
            )),
        }
    }

    pub fn kind(&self) -> DetectorKind {
        match self {
            Detector::Envelope(_) => DetectorKind::Envelope,
            Detector::IsolationForest(_) => DetectorKind::IsolationForest,
        }
    }

    pub(crate) fn validate(&self, width: usize) -> Result<(), String> {
        match self {
            Detector::Envelope(d) => d.validate(),
            Detector::IsolationForest(d) => d.validate(width),
        }
    }
}

impl AnomalyDetector for Detector {
    fn fit(&mut self, rows: &[Vec<f64>]) {
        match self {
            Detector::Envelope(d) => d.fit(rows),
            Detector::IsolationForest(d) => d.fit(rows),
        }
    }

    fn score(&self, row: &[f64]) -> f64 {
        match self {
            Detector::Envelope(d) => d.score(row),
            Detector::IsolationForest(d) => d.score(row),
        }
    }
}

/// Logistic squashing of a raw detector score.
///
/// Each detector has its own raw range, so the constants are per kind. A
/// confidence of 0.85 sits where ln(0.85 / 0.15) = steepness × (raw + offset):
/// raw 0 for the envelope, raw -0.25 for the forest, whose out-of-range
/// isolation pulls genuine samples just outside the enrollment range below 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub steepness: f64,
    pub offset: f64,
}

impl Calibration {
    pub fn for_kind(kind: DetectorKind) -> Self {
        match kind {
            // raw in (-inf, 1]
            DetectorKind::Envelope => Self {
                steepness: 10.0,
                offset: 0.1735,
            },
            // raw roughly in [-0.9, 0.2]
            DetectorKind::IsolationForest => Self {
                steepness: 20.0,
                offset: 0.3367,
            },
        }
    }

    pub fn confidence(&self, raw: f64) -> f64 {
        let c = 1.0 / (1.0 + (-self.steepness * (raw + self.offset)).exp());
        if c.is_nan() {
            return 0.0;
        }
        c.clamp(0.0, 1.0)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(self.steepness.is_finite() && self.steepness > 0.0 && self.offset.is_finite()) {
            return Err("calibration must have finite positive steepness".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_maps_near_default_threshold() {
        for (kind, raw) in [
            (DetectorKind::Envelope, 0.0),
            (DetectorKind::IsolationForest, -0.25),
        ] {
            let c = Calibration::for_kind(kind).confidence(raw);
            assert!((c - 0.85).abs() < 0.005, "{:?}: {}", kind, c);
        }
        // forest training rows at the contamination quantile are confidently genuine
        let fitted = Calibration::for_kind(DetectorKind::IsolationForest).confidence(0.0);
        assert!(fitted > 0.99);
    }

    #[test]
    fn calibration_is_monotonic_and_bounded() {
        let cal = Calibration::for_kind(DetectorKind::Envelope);
        let mut prev = 0.0;
        for raw in [-1e9, -10.0, -0.5, 0.0, 0.3, 1.0] {
            let c = cal.confidence(raw);
            assert!((0.0..=1.0).contains(&c));
            assert!(c >= prev);
            prev = c;
        }
        assert_eq!(cal.confidence(f64::NAN), 0.0);
    }
}
