//! Enrollment: `Unregistered → Collecting(n) → Enrolled`.
//!
//! Transitions are pure. They take the stored profile (if any) and return the
//! next one; persisting it, and serializing calls per identity, is up to the caller.

mod profile;

pub use profile::EnrollmentProfile;

use crate::config::{EnrollmentConfig, ModelConfig};
use crate::error::{AuthError, Result};
use crate::features::FeatureVector;
use crate::model::AuthenticationModel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EnrollmentState {
    Unregistered,
    Collecting { samples: usize },
    Enrolled,
}

/// Progress report returned by every enrollment operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentStatus {
    pub identity: String,
    pub samples_collected: usize,
    pub samples_required: usize,
    pub remaining: usize,
    pub enrolled: bool,
    pub message: String,
}

pub struct Enrollment {
    config: EnrollmentConfig,
    model: ModelConfig,
}

impl Enrollment {
    pub fn new(config: EnrollmentConfig, model: ModelConfig) -> Self {
        Self { config, model }
    }

    pub fn samples_required(&self) -> usize {
        self.config.samples_required
    }

    pub fn state(&self, profile: Option<&EnrollmentProfile>) -> EnrollmentState {
        match profile {
            None => EnrollmentState::Unregistered,
            Some(p) if p.is_enrolled() => EnrollmentState::Enrolled,
            Some(p) => EnrollmentState::Collecting {
                samples: p.sample_count(),
            },
        }
    }

    /// First sample for a new identity.
    pub fn register(
        &self,
        existing: Option<&EnrollmentProfile>,
        identity: &str,
        sample: FeatureVector,
        device_type: &str,
    ) -> Result<EnrollmentProfile> {
        if existing.is_some() {
            return Err(AuthError::DuplicateIdentity(identity.to_string()));
        }
        let profile = EnrollmentProfile::new(
            identity,
            sample,
            self.config.confidence_threshold,
            device_type,
        );
        tracing::info!(identity, "identity registered");
        self.complete_if_ready(profile)
    }

    /// Append a sample; trains and freezes the profile when the requirement is met.
    pub fn add_sample(
        &self,
        profile: &EnrollmentProfile,
        sample: FeatureVector,
    ) -> Result<EnrollmentProfile> {
        if profile.is_enrolled() {
            return Err(AuthError::AlreadyEnrolled(profile.identity.clone()));
        }
        let next = profile.appended(sample);
        tracing::debug!(
            identity = %next.identity,
            samples = next.sample_count(),
            required = self.config.samples_required,
            "enrollment sample recorded"
        );
        self.complete_if_ready(next)
    }

    fn complete_if_ready(&self, profile: EnrollmentProfile) -> Result<EnrollmentProfile> {
        if profile.sample_count() < self.config.samples_required {
            return Ok(profile);
        }
        let mut model = AuthenticationModel::new(self.model.clone(), self.config.samples_required);
        for v in profile.vectors() {
            model.add_training_sample(v.clone());
        }
        if !model.train() || !model.is_trained() {
            return Err(AuthError::TrainingFailed {
                identity: profile.identity.clone(),
                samples: profile.sample_count(),
            });
        }
        let artifact = model.serialize()?;
        tracing::info!(
            identity = %profile.identity,
            samples = profile.sample_count(),
            method = %model.method(),
            "enrollment complete"
        );
        Ok(profile.with_model(artifact))
    }

    /// Rebuild the profile's model; `None` while still collecting.
    pub fn load_model(&self, profile: &EnrollmentProfile) -> Result<Option<AuthenticationModel>> {
        profile
            .model_artifact()
            .map(|blob| {
                AuthenticationModel::deserialize(
                    blob,
                    self.model.clone(),
                    self.config.samples_required,
                )
            })
            .transpose()
    }

    pub fn status(&self, profile: &EnrollmentProfile) -> EnrollmentStatus {
        let collected = profile.sample_count();
        let required = self.config.samples_required;
        let enrolled = profile.is_enrolled();
        let remaining = if enrolled {
            0
        } else {
            required.saturating_sub(collected)
        };
        let message = if enrolled {
            "Enrollment complete".to_string()
        } else {
            format!("{} more sample(s) needed to complete enrollment", remaining)
        };
        EnrollmentStatus {
            identity: profile.identity.clone(),
            samples_collected: collected,
            samples_required: required,
            remaining,
            enrolled,
            message,
        }
    }
}
