use super::engine::AttemptRecord;
use serde::{Deserialize, Serialize};

/// Attempts included in a history report
pub const HISTORY_LIMIT: usize = 50;
/// Most recent attempts the security score looks at
pub const SECURITY_WINDOW: usize = 20;

/// Summary of an identity's recent authentication attempts. Percentages are
/// on a 0-100 scale, rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthHistory {
    pub identity: String,
    pub total_attempts: usize,
    pub success_rate: f64,
    pub avg_confidence: f64,
    /// Acceptance rate over the last [`SECURITY_WINDOW`] attempts; `None`
    /// until the identity is enrolled and has attempted at least once.
    pub security_score: Option<f64>,
    pub attempts: Vec<AttemptRecord>,
}

fn pct(x: f64) -> f64 {
    (x * 1000.0).round() / 10.0
}

fn acceptance(records: &[AttemptRecord]) -> f64 {
    let accepted = records.iter().filter(|r| r.accepted).count();
    accepted as f64 / records.len() as f64
}

impl AuthHistory {
    /// `attempts` newest first, as returned by the store.
    pub fn from_attempts(identity: &str, enrolled: bool, mut attempts: Vec<AttemptRecord>) -> Self {
        attempts.truncate(HISTORY_LIMIT);
        let total = attempts.len();
        let (success_rate, avg_confidence) = if total == 0 {
            (0.0, 0.0)
        } else {
            let conf: f64 = attempts.iter().map(|r| r.confidence).sum();
            (pct(acceptance(&attempts)), pct(conf / total as f64))
        };
        let security_score = (enrolled && total > 0)
            .then(|| pct(acceptance(&attempts[..total.min(SECURITY_WINDOW)])));

        Self {
            identity: identity.to_string(),
            total_attempts: total,
            success_rate,
            avg_confidence,
            security_score,
            attempts,
        }
    }
}
