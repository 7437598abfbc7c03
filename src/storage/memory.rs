use super::{check_expected, ProfileStore};
use crate::decision::AttemptRecord;
use crate::enrollment::EnrollmentProfile;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Process-local store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<String, EnrollmentProfile>>,
    attempts: Mutex<Vec<AttemptRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryStore {
    fn load_profile(&self, identity: &str) -> Result<Option<EnrollmentProfile>> {
        let profiles = self.profiles.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(profiles.get(identity).cloned())
    }

    fn save_profile(
        &self,
        profile: &EnrollmentProfile,
        expected_samples: Option<usize>,
    ) -> Result<()> {
        let mut profiles = self.profiles.lock().unwrap_or_else(PoisonError::into_inner);
        let found = profiles.get(&profile.identity).map(|p| p.sample_count());
        check_expected(&profile.identity, expected_samples, found)?;
        profiles.insert(profile.identity.clone(), profile.clone());
        Ok(())
    }

    fn record_attempt(&self, attempt: &AttemptRecord) -> Result<()> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(attempt.clone());
        Ok(())
    }

    fn attempts(&self, identity: &str, limit: usize) -> Result<Vec<AttemptRecord>> {
        let attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(attempts
            .iter()
            .rev()
            .filter(|a| a.identity == identity)
            .take(limit)
            .cloned()
            .collect())
    }

    fn prune_attempts_before(&self, ts: i64) -> Result<u64> {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let before = attempts.len();
        attempts.retain(|a| a.ts.timestamp_millis() >= ts);
        Ok((before - attempts.len()) as u64)
    }
}
