//! Service configuration. Loaded from a JSON document; every section has defaults.

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Data directory (encrypted profile store)
    pub data_dir: PathBuf,
    /// Enrollment requirements and default decision threshold
    pub enrollment: EnrollmentConfig,
    /// Authentication model parameters
    pub model: ModelConfig,
    /// Replay and rate-limit windows
    pub guards: GuardsConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Samples needed before the model is trained and the profile frozen
    pub samples_required: usize,
    /// Default acceptance threshold for new profiles (0.0–1.0)
    pub confidence_threshold: f64,
    /// Minimum keystrokes accepted per submitted sample
    pub min_keystrokes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Envelope,
    IsolationForest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// One-class detector fitted once enrollment is complete
    pub detector: DetectorKind,
    /// Seed for detectors with a randomized fit
    pub seed: u64,
    /// Isolation forest: number of trees
    pub n_estimators: usize,
    /// Isolation forest: rows sampled per tree (capped at the row count)
    pub max_samples: usize,
    /// Isolation forest: expected outlier share of the training set
    pub contamination: f64,
    /// Envelope: radius multiplier over the widest training sample
    pub envelope_tolerance: f64,
    /// Envelope: lower bound on the fitted radius
    pub envelope_min_radius: f64,
    /// Envelope: share of the largest per-feature deviations ignored
    pub envelope_trim: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardsConfig {
    /// Replay window (seconds)
    pub replay_window_secs: u64,
    /// Attempts allowed per identity within the rate-limit window
    pub rate_limit_max_attempts: u32,
    /// Rate-limit window (seconds)
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".keyauth"),
            enrollment: EnrollmentConfig::default(),
            model: ModelConfig::default(),
            guards: GuardsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            samples_required: 5,
            confidence_threshold: 0.85,
            min_keystrokes: 5,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::Envelope,
            seed: 42,
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            envelope_tolerance: 2.0,
            envelope_min_radius: 0.5,
            envelope_trim: 0.1,
        }
    }
}

impl Default for GuardsConfig {
    fn default() -> Self {
        Self {
            replay_window_secs: 300,
            rate_limit_max_attempts: 10,
            rate_limit_window_secs: 60,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl AuthConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(data) => match serde_json::from_str::<AuthConfig>(&data) {
                    Ok(c) => return c,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "invalid config; using defaults")
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable config; using defaults")
                }
            }
        }
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        let e = &self.enrollment;
        if e.samples_required < 2 {
            return Err(AuthError::Config(format!(
                "enrollment.samples_required must be at least 2, got {}",
                e.samples_required
            )));
        }
        if !(e.confidence_threshold > 0.0 && e.confidence_threshold <= 1.0) {
            return Err(AuthError::Config(format!(
                "enrollment.confidence_threshold must be in (0, 1], got {}",
                e.confidence_threshold
            )));
        }
        if e.min_keystrokes < 2 {
            return Err(AuthError::Config(
                "enrollment.min_keystrokes must be at least 2".into(),
            ));
        }
        let m = &self.model;
        if m.n_estimators == 0 || m.max_samples < 2 {
            return Err(AuthError::Config(
                "model.n_estimators must be positive and model.max_samples at least 2".into(),
            ));
        }
        if !(0.0..0.5).contains(&m.contamination) {
            return Err(AuthError::Config(format!(
                "model.contamination must be in [0, 0.5), got {}",
                m.contamination
            )));
        }
        if m.envelope_tolerance <= 0.0 || m.envelope_min_radius <= 0.0 {
            return Err(AuthError::Config(
                "model.envelope_tolerance and model.envelope_min_radius must be positive".into(),
            ));
        }
        if !(0.0..0.5).contains(&m.envelope_trim) {
            return Err(AuthError::Config(format!(
                "model.envelope_trim must be in [0, 0.5), got {}",
                m.envelope_trim
            )));
        }
        let g = &self.guards;
        if g.replay_window_secs == 0 || g.rate_limit_window_secs == 0 {
            return Err(AuthError::Config("guard windows must be positive".into()));
        }
        Ok(())
    }
}
