use crate::features::FeatureVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's accumulated enrollment samples and, once enrolled, the model artifact.
///
/// Vectors are append-only; the sample count is always their length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentProfile {
    pub identity: String,
    vectors: Vec<FeatureVector>,
    pub threshold: f64,
    model: Option<String>,
    pub device_type: String,
    pub created_at: DateTime<Utc>,
}

impl EnrollmentProfile {
    pub(crate) fn new(
        identity: &str,
        first: FeatureVector,
        threshold: f64,
        device_type: &str,
    ) -> Self {
        Self {
            identity: identity.to_string(),
            vectors: vec![first],
            threshold,
            model: None,
            device_type: device_type.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Reassemble a profile read back from storage.
    pub fn from_parts(
        identity: String,
        vectors: Vec<FeatureVector>,
        threshold: f64,
        model: Option<String>,
        device_type: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            vectors,
            threshold,
            model,
            device_type,
            created_at,
        }
    }

    pub fn vectors(&self) -> &[FeatureVector] {
        &self.vectors
    }

    pub fn sample_count(&self) -> usize {
        self.vectors.len()
    }

    pub fn model_artifact(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn is_enrolled(&self) -> bool {
        self.model.is_some()
    }

    pub(crate) fn appended(&self, sample: FeatureVector) -> Self {
        let mut next = self.clone();
        next.vectors.push(sample);
        next
    }

    pub(crate) fn with_model(mut self, artifact: String) -> Self {
        self.model = Some(artifact);
        self
    }
}
