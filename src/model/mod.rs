//! Per-user keystroke model.
//!
//! Below the enrollment requirement there is too little data for a one-class
//! model, so scoring falls back to a statistical distance comparison. Once the
//! requirement is met an anomaly detector is fitted over standardized vectors.

mod artifact;
mod detector;
mod envelope;
mod forest;
mod scaler;

pub use artifact::{ModelArtifact, ARTIFACT_VERSION};
pub use detector::{AnomalyDetector, Calibration, Detector};
pub use envelope::Envelope;
pub use forest::IsolationForest;
pub use scaler::StandardScaler;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::features::{FeatureVector, FEATURE_LAYOUT_VERSION};
use crate::stats::{cosine_similarity, manhattan, normalize};
use serde::{Deserialize, Serialize};

/// Share of the statistical score carried by the distance term
const DISTANCE_WEIGHT: f64 = 0.6;
/// Share carried by cosine similarity
const SIMILARITY_WEIGHT: f64 = 0.4;
/// Average normalized L1 distance per feature at which distance confidence reaches 0
const DISTANCE_SCALE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    NoProfile,
    Statistical,
    AnomalyDetection,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::NoProfile => "no_profile",
            Method::Statistical => "statistical",
            Method::AnomalyDetection => "anomaly_detection",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "no_profile" => Ok(Method::NoProfile),
            "statistical" => Ok(Method::Statistical),
            "anomaly_detection" => Ok(Method::AnomalyDetection),
            other => Err(format!("unknown scoring method '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthenticationModel {
    config: ModelConfig,
    required_samples: usize,
    training_vectors: Vec<FeatureVector>,
    /// Fitted on the enrollment set: the profile's global shape
    scaler: Option<StandardScaler>,
    detector: Option<Detector>,
    calibration: Calibration,
    trained: bool,
}

impl AuthenticationModel {
    pub fn new(config: ModelConfig, required_samples: usize) -> Self {
        let calibration = Calibration::for_kind(config.detector);
        Self {
            config,
            required_samples,
            training_vectors: Vec::new(),
            scaler: None,
            detector: None,
            calibration,
            trained: false,
        }
    }

    pub fn add_training_sample(&mut self, vector: FeatureVector) {
        self.training_vectors.push(vector);
    }

    pub fn training_vectors(&self) -> &[FeatureVector] {
        &self.training_vectors
    }

    /// True once an anomaly detector has been fitted.
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Scoring method `authenticate` would use right now.
    pub fn method(&self) -> Method {
        if self.training_vectors.is_empty() {
            Method::NoProfile
        } else if self.trained {
            Method::AnomalyDetection
        } else {
            Method::Statistical
        }
    }

    /// Fit on the accumulated vectors. Returns `false` with fewer than 2 vectors.
    pub fn train(&mut self) -> bool {
        let n = self.training_vectors.len();
        if n < 2 {
            tracing::debug!(samples = n, "too few samples to train");
            return false;
        }
        let Some(scaler) = StandardScaler::fit(&self.training_vectors) else {
            return false;
        };

        if n >= self.required_samples {
            let rows: Vec<Vec<f64>> = self
                .training_vectors
                .iter()
                .map(|v| scaler.transform(v.as_slice()))
                .collect();
            let mut detector = Detector::from_config(&self.config);
            detector.fit(&rows);
            self.calibration = Calibration::for_kind(detector.kind());
            self.detector = Some(detector);
            self.trained = true;
        } else {
            self.detector = None;
            self.trained = false;
        }
        self.scaler = Some(scaler);
        tracing::info!(samples = n, method = %self.method(), "model trained");
        true
    }

    /// Score `candidate`; confidence is always within [0, 1].
    pub fn authenticate(&self, candidate: &FeatureVector) -> (f64, Method) {
        match self.method() {
            Method::NoProfile => (0.0, Method::NoProfile),
            Method::AnomalyDetection => (self.anomaly_confidence(candidate), Method::AnomalyDetection),
            Method::Statistical => (self.statistical_confidence(candidate), Method::Statistical),
        }
    }

    fn anomaly_confidence(&self, candidate: &FeatureVector) -> f64 {
        let (Some(scaler), Some(detector)) = (&self.scaler, &self.detector) else {
            return 0.0;
        };
        let raw = detector.score(&scaler.transform(candidate.as_slice()));
        self.calibration.confidence(raw)
    }

    /// Compares the candidate's own shape with each training vector's shape, so
    /// every vector is z-normalized on its own rather than with the fitted scaler.
    fn statistical_confidence(&self, candidate: &FeatureVector) -> f64 {
        let test = normalize(candidate.as_slice());
        let (mut dist_sum, mut sim_sum) = (0.0, 0.0);
        for v in &self.training_vectors {
            let train = normalize(v.as_slice());
            dist_sum += manhattan(&test, &train);
            sim_sum += cosine_similarity(&test, &train);
        }
        let n = self.training_vectors.len() as f64;
        let (avg_distance, avg_similarity) = (dist_sum / n, sim_sum / n);

        let width = candidate.len() as f64;
        let distance_conf = (1.0 - avg_distance / (DISTANCE_SCALE * width)).max(0.0);
        (DISTANCE_WEIGHT * distance_conf + SIMILARITY_WEIGHT * avg_similarity.max(0.0))
            .clamp(0.0, 1.0)
    }

    pub fn to_artifact(&self) -> ModelArtifact {
        match (&self.scaler, &self.detector) {
            (Some(scaler), Some(detector)) if self.trained => ModelArtifact::AnomalyDetection {
                version: ARTIFACT_VERSION,
                feature_layout: FEATURE_LAYOUT_VERSION,
                training_vectors: self.training_vectors.clone(),
                scaler: scaler.clone(),
                detector: detector.clone(),
                calibration: self.calibration,
            },
            _ => ModelArtifact::Statistical {
                version: ARTIFACT_VERSION,
                feature_layout: FEATURE_LAYOUT_VERSION,
                training_vectors: self.training_vectors.clone(),
            },
        }
    }

    pub fn serialize(&self) -> Result<String> {
        self.to_artifact().encode()
    }

    /// Rebuild from an artifact. Scoring depends only on the artifact; `config`
    /// and `required_samples` govern later calls to [`train`](Self::train).
    pub fn from_artifact(
        artifact: ModelArtifact,
        config: ModelConfig,
        required_samples: usize,
    ) -> Self {
        let mut model = Self::new(config, required_samples);
        match artifact {
            ModelArtifact::Statistical {
                training_vectors, ..
            } => {
                model.training_vectors = training_vectors;
                // the scaler is not persisted in this mode
                model.scaler = StandardScaler::fit(&model.training_vectors);
            }
            ModelArtifact::AnomalyDetection {
                training_vectors,
                scaler,
                detector,
                calibration,
                ..
            } => {
                model.training_vectors = training_vectors;
                model.scaler = Some(scaler);
                model.detector = Some(detector);
                model.calibration = calibration;
                model.trained = true;
            }
        }
        model
    }

    pub fn deserialize(data: &str, config: ModelConfig, required_samples: usize) -> Result<Self> {
        Ok(Self::from_artifact(
            ModelArtifact::decode(data)?,
            config,
            required_samples,
        ))
    }
}
