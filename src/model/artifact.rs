//! Versioned, inspectable model artifact.
//!
//! A JSON tagged union: `mode` selects the statistical payload (training vectors
//! only) or the anomaly-detection payload (vectors plus fitted scaler, detector
//! and calibration). Decoding never consults anything outside the document.

use super::detector::{Calibration, Detector};
use super::scaler::StandardScaler;
use super::Method;
use crate::error::{AuthError, Result};
use crate::features::{FeatureVector, FEATURE_LAYOUT_VERSION, FEATURE_LEN};
use serde::{Deserialize, Serialize};

/// Version 2: envelope trimming and inflation, split ranges in forest nodes
pub const ARTIFACT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModelArtifact {
    Statistical {
        version: u32,
        feature_layout: u32,
        training_vectors: Vec<FeatureVector>,
    },
    AnomalyDetection {
        version: u32,
        feature_layout: u32,
        training_vectors: Vec<FeatureVector>,
        scaler: StandardScaler,
        detector: Detector,
        calibration: Calibration,
    },
}

impl ModelArtifact {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate. Any defect is reported as [`AuthError::CorruptModel`].
    pub fn decode(data: &str) -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_str(data).map_err(|e| AuthError::CorruptModel(e.to_string()))?;
        artifact.validate().map_err(AuthError::CorruptModel)?;
        Ok(artifact)
    }

    pub fn mode(&self) -> Method {
        match self {
            ModelArtifact::Statistical { .. } => Method::Statistical,
            ModelArtifact::AnomalyDetection { .. } => Method::AnomalyDetection,
        }
    }

    pub fn training_vectors(&self) -> &[FeatureVector] {
        match self {
            ModelArtifact::Statistical {
                training_vectors, ..
            }
            | ModelArtifact::AnomalyDetection {
                training_vectors, ..
            } => training_vectors,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let (version, layout) = match self {
            ModelArtifact::Statistical {
                version,
                feature_layout,
                ..
            }
            | ModelArtifact::AnomalyDetection {
                version,
                feature_layout,
                ..
            } => (*version, *feature_layout),
        };
        if version != ARTIFACT_VERSION {
            return Err(format!("unsupported artifact version {}", version));
        }
        if layout != FEATURE_LAYOUT_VERSION {
            return Err(format!("artifact built for feature layout {}", layout));
        }
        if let ModelArtifact::AnomalyDetection {
            training_vectors,
            scaler,
            detector,
            calibration,
            ..
        } = self
        {
            if training_vectors.len() < 2 {
                return Err("anomaly model needs at least 2 training vectors".into());
            }
            scaler.validate(FEATURE_LEN)?;
            detector.validate(FEATURE_LEN)?;
            calibration.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_corrupt_not_panic() {
        for bad in [
            "",
            "not json",
            r#"{"mode":"mystery"}"#,
            r#"{"mode":"statistical","version":99,"feature_layout":1,"training_vectors":[]}"#,
            r#"{"mode":"statistical","version":2,"feature_layout":1,"training_vectors":[[1.0,2.0]]}"#,
        ] {
            assert!(
                matches!(ModelArtifact::decode(bad), Err(AuthError::CorruptModel(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn statistical_payload_is_inspectable() {
        let a = ModelArtifact::Statistical {
            version: ARTIFACT_VERSION,
            feature_layout: FEATURE_LAYOUT_VERSION,
            training_vectors: vec![FeatureVector::try_from(vec![1.0; FEATURE_LEN]).unwrap()],
        };
        let json = a.encode().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["mode"], "statistical");
        assert_eq!(v["training_vectors"][0].as_array().unwrap().len(), FEATURE_LEN);
        assert_eq!(ModelArtifact::decode(&json).unwrap(), a);
    }
}
