//! KeyAuth: keystroke-dynamics authentication core.
//!
//! Modular structure:
//! - [`features`]: Keystroke timing → fixed 36-value feature vector
//! - [`stats`]: Descriptive statistics and vector distances
//! - [`model`]: Per-user statistical / one-class anomaly model
//! - [`enrollment`]: Enrollment state machine
//! - [`guards`]: Anti-replay and rate limiting
//! - [`decision`]: Accept/reject decision and attempt history
//! - [`storage`]: Profile store trait, in-memory and encrypted SQLite stores
//! - [`service`]: Operations exposed to a transport
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod decision;
pub mod enrollment;
pub mod error;
pub mod features;
pub mod guards;
pub mod logging;
pub mod model;
pub mod service;
pub mod stats;
pub mod storage;

pub use config::AuthConfig;
pub use decision::{AuthDecision, DecisionEngine};
pub use enrollment::{Enrollment, EnrollmentProfile, EnrollmentState, EnrollmentStatus};
pub use error::{AuthError, Result};
pub use features::{FeatureExtractor, FeatureVector, KeystrokeEvent};
pub use guards::{RateLimiter, ReplayGuard};
pub use logging::StructuredLogger;
pub use model::{AuthenticationModel, Method};
pub use service::{AttemptOutcome, AuthService, SampleSubmission};
pub use storage::{MemoryStore, ProfileStore, SecureStore};
