//! Compares a confidence with the profile threshold; produces the decision.

use crate::model::Method;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of scoring a single attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthDecision {
    pub confidence: f64,
    pub method: Method,
    pub accepted: bool,
    pub threshold: f64,
}

impl AuthDecision {
    pub fn message(&self) -> String {
        if self.accepted {
            format!(
                "Identity verified (confidence: {:.1}%, method: {})",
                self.confidence * 100.0,
                self.method
            )
        } else {
            format!(
                "Authentication failed. Confidence {:.1}% is below threshold {:.1}%.",
                self.confidence * 100.0,
                self.threshold * 100.0
            )
        }
    }
}

/// One scored attempt as kept in the store's attempt log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: String,
    pub identity: String,
    pub confidence: f64,
    pub accepted: bool,
    pub method: Method,
    pub device_type: String,
    pub ts: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(identity: &str, decision: &AuthDecision, device_type: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            identity: identity.to_string(),
            confidence: decision.confidence,
            accepted: decision.accepted,
            method: decision.method,
            device_type: device_type.to_string(),
            ts: Utc::now(),
        }
    }
}

pub struct DecisionEngine {
    default_threshold: f64,
}

impl DecisionEngine {
    pub fn new(default_threshold: f64) -> Self {
        Self { default_threshold }
    }

    /// `threshold` is the profile's own; falls back to the configured default.
    /// A `NoProfile` result is never accepted.
    pub fn decide(&self, confidence: f64, method: Method, threshold: Option<f64>) -> AuthDecision {
        let threshold = threshold.unwrap_or(self.default_threshold);
        let accepted = method != Method::NoProfile && confidence >= threshold;
        AuthDecision {
            confidence,
            method,
            accepted,
            threshold,
        }
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        let engine = DecisionEngine::new(0.85);
        assert!(engine.decide(0.85, Method::AnomalyDetection, None).accepted);
        assert!(!engine.decide(0.8499, Method::AnomalyDetection, None).accepted);
    }

    #[test]
    fn profile_threshold_wins() {
        let engine = DecisionEngine::new(0.85);
        let d = engine.decide(0.7, Method::Statistical, Some(0.6));
        assert!(d.accepted);
        assert_eq!(d.threshold, 0.6);
    }

    #[test]
    fn no_profile_is_rejected() {
        let engine = DecisionEngine::new(0.0);
        assert!(!engine.decide(0.0, Method::NoProfile, None).accepted);
    }

    #[test]
    fn messages_mention_confidence() {
        let engine = DecisionEngine::new(0.85);
        let ok = engine.decide(0.93, Method::AnomalyDetection, None);
        assert_eq!(
            ok.message(),
            "Identity verified (confidence: 93.0%, method: anomaly_detection)"
        );
        let bad = engine.decide(0.4, Method::AnomalyDetection, None);
        assert!(bad.message().contains("below threshold 85.0%"));
    }
}
