//! Radial one-class envelope in standardized feature space.
//!
//! Fit records the widest enrollment sample (RMS of its z-scores) and inflates it
//! by a tolerance. Unlike tree ensembles the score keeps falling outside the
//! enrollment range, so a sample typed at a very different pace scores far below 0.
//!
//! A handful of enrollment rows underestimates the spread of fresh samples: a
//! new genuine row standardized with an `n`-row scaler has an expected squared
//! z-score near `(n + 1) / (n - 3)`, not 1. The fitted radius is widened by the
//! square root of that factor. The RMS also drops the largest `trim` share of
//! squared z-scores so one erratic key cannot dominate the distance.

use super::detector::AnomalyDetector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub tolerance: f64,
    pub min_radius: f64,
    /// Share of the largest squared z-scores ignored by the RMS
    pub trim: f64,
    /// Fitted boundary; 0 until `fit` runs
    pub radius: f64,
}

/// Widening for a scaler fitted on `n` rows.
fn small_sample_inflation(n: usize) -> f64 {
    let n = n as f64;
    ((n + 1.0) / (n - 3.0).max(1.0)).sqrt()
}

fn trimmed_rms(row: &[f64], trim: f64) -> f64 {
    if row.is_empty() {
        return 0.0;
    }
    let mut squares: Vec<f64> = row.iter().map(|z| z * z).collect();
    squares.sort_by(|a, b| a.total_cmp(b));
    let dropped = ((trim * row.len() as f64).ceil() as usize).min(row.len() - 1);
    let kept = &squares[..row.len() - dropped];
    (kept.iter().sum::<f64>() / kept.len() as f64).sqrt()
}

impl Envelope {
    pub fn new(tolerance: f64, min_radius: f64, trim: f64) -> Self {
        Self {
            tolerance,
            min_radius,
            trim,
            radius: 0.0,
        }
    }

    fn distance(&self, row: &[f64]) -> f64 {
        trimmed_rms(row, self.trim)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(format!("envelope radius must be positive, got {}", self.radius));
        }
        if !(0.0..0.5).contains(&self.trim) {
            return Err(format!("envelope trim must be in [0, 0.5), got {}", self.trim));
        }
        Ok(())
    }
}

impl AnomalyDetector for Envelope {
    fn fit(&mut self, rows: &[Vec<f64>]) {
        let widest = rows.iter().map(|r| self.distance(r)).fold(0.0, f64::max);
        let inflation = small_sample_inflation(rows.len());
        self.radius = self.tolerance * (widest * inflation).max(self.min_radius);
        tracing::debug!(
            rows = rows.len(),
            widest,
            inflation,
            radius = self.radius,
            "envelope fitted"
        );
    }

    fn score(&self, row: &[f64]) -> f64 {
        if self.radius <= 0.0 {
            return f64::NEG_INFINITY;
        }
        (self.radius - self.distance(row)) / self.radius
    }
}
