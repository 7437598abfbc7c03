//! Service façade: validates submissions, applies the abuse guards, drives
//! enrollment and scoring against a [`ProfileStore`].

use crate::config::AuthConfig;
use crate::decision::{AttemptRecord, AuthDecision, AuthHistory, DecisionEngine, HISTORY_LIMIT};
use crate::enrollment::{Enrollment, EnrollmentStatus};
use crate::error::{AuthError, Result};
use crate::features::{ExtractedFeatures, FeatureExtractor, KeystrokeEvent};
use crate::guards::{RateLimiter, ReplayGuard};
use crate::model::Method;
use crate::storage::ProfileStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

fn default_device_type() -> String {
    "web".to_string()
}

/// A typing sample as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSubmission {
    pub keystrokes: Vec<KeystrokeEvent>,
    /// Metadata only; never used for scoring
    #[serde(default = "default_device_type")]
    pub device_type: String,
}

impl SampleSubmission {
    pub fn new(keystrokes: Vec<KeystrokeEvent>) -> Self {
        Self {
            keystrokes,
            device_type: default_device_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Scored(AuthDecision),
    ReplayDetected,
    RateLimited { remaining: u32 },
}

pub struct AuthService<S: ProfileStore> {
    config: AuthConfig,
    store: Arc<S>,
    extractor: FeatureExtractor,
    enrollment: Enrollment,
    decisions: DecisionEngine,
    replay: Arc<ReplayGuard>,
    limiter: Arc<RateLimiter>,
    /// Serializes register/enroll per identity within this process
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: ProfileStore> AuthService<S> {
    pub fn new(config: AuthConfig, store: Arc<S>) -> Result<Self> {
        config.validate()?;
        let guards = &config.guards;
        let replay = Arc::new(ReplayGuard::new(guards.replay_window_secs));
        let limiter = Arc::new(RateLimiter::new(
            guards.rate_limit_max_attempts,
            guards.rate_limit_window_secs,
        ));
        Ok(Self {
            extractor: FeatureExtractor::new(),
            enrollment: Enrollment::new(config.enrollment.clone(), config.model.clone()),
            decisions: DecisionEngine::new(config.enrollment.confidence_threshold),
            store,
            replay,
            limiter,
            locks: Mutex::new(HashMap::new()),
            config,
        })
    }

    /// Replace the guards, e.g. to share them between services or drive them with a manual clock.
    pub fn with_guards(mut self, replay: Arc<ReplayGuard>, limiter: Arc<RateLimiter>) -> Self {
        self.replay = replay;
        self.limiter = limiter;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn extract_features(&self, events: &[KeystrokeEvent]) -> Result<ExtractedFeatures> {
        self.extractor.extract(events)
    }

    fn check_length(&self, submission: &SampleSubmission) -> Result<()> {
        let min = self.config.enrollment.min_keystrokes;
        let got = submission.keystrokes.len();
        if got < min {
            return Err(AuthError::TooFewKeystrokes { got, min });
        }
        Ok(())
    }

    fn with_identity_lock<T>(&self, identity: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(identity.to_string()).or_default().clone()
        };
        let result = {
            let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // map entry plus ours: nobody else is waiting on it
        if Arc::strong_count(&lock) == 2 {
            locks.remove(identity);
        }
        result
    }

    /// Create a profile from the first enrollment sample.
    pub fn register(&self, identity: &str, submission: &SampleSubmission) -> Result<EnrollmentStatus> {
        self.check_length(submission)?;
        let features = self.extractor.extract(&submission.keystrokes)?;
        self.with_identity_lock(identity, || {
            let existing = self.store.load_profile(identity)?;
            let profile = self.enrollment.register(
                existing.as_ref(),
                identity,
                features.vector,
                &submission.device_type,
            )?;
            self.store.save_profile(&profile, None)?;
            Ok(self.enrollment.status(&profile))
        })
    }

    /// Add one enrollment sample; the profile is trained once enough are collected.
    pub fn enroll_sample(
        &self,
        identity: &str,
        submission: &SampleSubmission,
    ) -> Result<EnrollmentStatus> {
        self.check_length(submission)?;
        let features = self.extractor.extract(&submission.keystrokes)?;
        self.with_identity_lock(identity, || {
            let profile = self
                .store
                .load_profile(identity)?
                .ok_or_else(|| AuthError::UnknownIdentity(identity.to_string()))?;
            let next = self.enrollment.add_sample(&profile, features.vector)?;
            self.store.save_profile(&next, Some(profile.sample_count()))?;
            Ok(self.enrollment.status(&next))
        })
    }

    /// Score a login attempt. Guard rejections are outcomes, not errors.
    pub fn score_authentication_attempt(
        &self,
        identity: &str,
        submission: &SampleSubmission,
    ) -> Result<AttemptOutcome> {
        self.check_length(submission)?;

        if !self.limiter.try_acquire(identity) {
            return Ok(AttemptOutcome::RateLimited {
                remaining: self.limiter.remaining(identity),
            });
        }

        let Some(profile) = self.store.load_profile(identity)? else {
            info!(identity, "authentication attempt for unknown identity");
            return Ok(AttemptOutcome::Scored(
                self.decisions.decide(0.0, Method::NoProfile, None),
            ));
        };
        let not_enrolled = || AuthError::NotEnrolled {
            identity: identity.to_string(),
            remaining: self.enrollment.status(&profile).remaining,
        };
        if !profile.is_enrolled() {
            return Err(not_enrolled());
        }

        if !self.replay.check_and_record(&submission.keystrokes) {
            return Ok(AttemptOutcome::ReplayDetected);
        }

        let features = self.extractor.extract(&submission.keystrokes)?;
        let model = self
            .enrollment
            .load_model(&profile)?
            .ok_or_else(not_enrolled)?;
        let (confidence, method) = model.authenticate(&features.vector);
        let decision = self
            .decisions
            .decide(confidence, method, Some(profile.threshold));

        self.store.record_attempt(&AttemptRecord::new(
            identity,
            &decision,
            &submission.device_type,
        ))?;
        info!(
            identity,
            confidence = decision.confidence,
            threshold = decision.threshold,
            method = %decision.method,
            accepted = decision.accepted,
            "authentication attempt scored"
        );
        Ok(AttemptOutcome::Scored(decision))
    }

    pub fn enrollment_status(&self, identity: &str) -> Result<EnrollmentStatus> {
        let profile = self
            .store
            .load_profile(identity)?
            .ok_or_else(|| AuthError::UnknownIdentity(identity.to_string()))?;
        Ok(self.enrollment.status(&profile))
    }

    pub fn auth_history(&self, identity: &str) -> Result<AuthHistory> {
        let profile = self
            .store
            .load_profile(identity)?
            .ok_or_else(|| AuthError::UnknownIdentity(identity.to_string()))?;
        let attempts = self.store.attempts(identity, HISTORY_LIMIT)?;
        Ok(AuthHistory::from_attempts(
            identity,
            profile.is_enrolled(),
            attempts,
        ))
    }
}
