//! Turns a model confidence into an accept/reject decision and summarizes past attempts.

mod engine;
mod history;

pub use engine::{AttemptRecord, AuthDecision, DecisionEngine};
pub use history::{AuthHistory, HISTORY_LIMIT, SECURITY_WINDOW};
