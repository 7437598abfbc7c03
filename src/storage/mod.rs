//! Profile persistence: enrollment profiles and the authentication attempt log.

mod encrypted;
mod memory;

pub use encrypted::SecureStore;
pub use memory::MemoryStore;

use crate::decision::AttemptRecord;
use crate::enrollment::EnrollmentProfile;
use crate::error::{AuthError, Result};

pub trait ProfileStore: Send + Sync {
    fn load_profile(&self, identity: &str) -> Result<Option<EnrollmentProfile>>;

    /// Write `profile` only if the stored sample count still equals
    /// `expected_samples` (`None`: no profile may exist yet). Fails with
    /// [`AuthError::ConcurrentUpdate`] otherwise and leaves the store unchanged.
    fn save_profile(&self, profile: &EnrollmentProfile, expected_samples: Option<usize>)
        -> Result<()>;

    fn record_attempt(&self, attempt: &AttemptRecord) -> Result<()>;

    /// Up to `limit` attempts for `identity`, newest first.
    fn attempts(&self, identity: &str, limit: usize) -> Result<Vec<AttemptRecord>>;

    /// Retention: delete attempts older than the given unix-millis timestamp.
    /// Returns the number removed.
    fn prune_attempts_before(&self, ts: i64) -> Result<u64>;
}

pub(crate) fn check_expected(
    identity: &str,
    expected: Option<usize>,
    found: Option<usize>,
) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        tracing::warn!(identity, ?expected, ?found, "stale profile write rejected");
        Err(AuthError::ConcurrentUpdate {
            identity: identity.to_string(),
            expected,
            found,
        })
    }
}
