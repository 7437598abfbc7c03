//! Error types for the KeyAuth core.

use thiserror::Error;

/// Errors surfaced by extraction, enrollment, scoring and storage.
///
/// Replay and rate-limit rejections are not errors; they are reported as
/// [`crate::service::AttemptOutcome`] variants.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("need at least 2 keystrokes to extract features, got {got}")]
    InsufficientData { got: usize },

    #[error("submission has {got} keystrokes, at least {min} required")]
    TooFewKeystrokes { got: usize, min: usize },

    #[error("identity '{0}' is already registered")]
    DuplicateIdentity(String),

    #[error("identity '{0}' is already enrolled")]
    AlreadyEnrolled(String),

    #[error("identity '{0}' not found")]
    UnknownIdentity(String),

    #[error("identity '{identity}' is not fully enrolled: {remaining} more sample(s) needed")]
    NotEnrolled { identity: String, remaining: usize },

    #[error("could not train a model for '{identity}' from {samples} sample(s)")]
    TrainingFailed { identity: String, samples: usize },

    #[error("model artifact is corrupt: {0}")]
    CorruptModel(String),

    #[error("profile for '{identity}' changed concurrently (expected {expected:?} samples, found {found:?})")]
    ConcurrentUpdate {
        identity: String,
        expected: Option<usize>,
        found: Option<usize>,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for AuthError {
    fn from(e: rusqlite::Error) -> Self {
        AuthError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
