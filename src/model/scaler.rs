//! Per-feature standardization fitted over the enrollment matrix.

use crate::features::FeatureVector;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Spreads this small relative to the feature mean are treated as constant.
const CONSTANT_REL_TOL: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    /// Population std per feature; 1.0 where the feature is constant
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit over `rows`. Returns `None` for an empty set.
    pub fn fit(rows: &[FeatureVector]) -> Option<Self> {
        let width = rows.first()?.len();
        let flat: Vec<f64> = rows
            .iter()
            .flat_map(|r| r.as_slice().iter().copied())
            .collect();
        let m = Array2::from_shape_vec((rows.len(), width), flat).ok()?;
        let mean = m.mean_axis(Axis(0))?;
        let std = m.std_axis(Axis(0), 0.0);
        let scale = std
            .iter()
            .zip(mean.iter())
            .map(|(s, mu)| {
                if *s <= CONSTANT_REL_TOL * mu.abs().max(1.0) {
                    1.0
                } else {
                    *s
                }
            })
            .collect();
        Some(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mu, s))| (x - mu) / s)
            .collect()
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub(crate) fn validate(&self, width: usize) -> Result<(), String> {
        if self.mean.len() != width || self.scale.len() != width {
            return Err(format!(
                "scaler width {}/{} does not match feature width {}",
                self.mean.len(),
                self.scale.len(),
                width
            ));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0)
            || self.mean.iter().any(|m| !m.is_finite())
        {
            return Err("scaler parameters must be finite with positive scale".into());
        }
        Ok(())
    }
}
