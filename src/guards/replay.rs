//! Rejects byte-identical resubmissions of a typing sample within a window.

use super::clock::{Clock, SystemClock};
use crate::features::KeystrokeEvent;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub type Fingerprint = [u8; 32];

/// SHA-256 over the ordered `(key, press_time, release_time)` tuples.
///
/// Keys are length-prefixed so concatenations cannot alias; times hash by bit pattern.
pub fn fingerprint(events: &[KeystrokeEvent]) -> Fingerprint {
    let mut h = Sha256::new();
    h.update((events.len() as u64).to_le_bytes());
    for e in events {
        h.update((e.key.len() as u64).to_le_bytes());
        h.update(e.key.as_bytes());
        h.update(e.press_time.to_bits().to_le_bytes());
        h.update(e.release_time.to_bits().to_le_bytes());
    }
    h.finalize().into()
}

pub struct ReplayGuard {
    window: Duration,
    clock: Arc<dyn Clock>,
    seen: Mutex<HashMap<Fingerprint, DateTime<Utc>>>,
}

impl ReplayGuard {
    pub fn new(window_secs: u64) -> Self {
        Self::with_clock(window_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(window_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
            clock,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// `true` if the sample is new (and is now remembered), `false` on a replay.
    ///
    /// Purge, lookup and insert happen under one lock, so two concurrent
    /// submissions of the same sample cannot both pass.
    pub fn check_and_record(&self, events: &[KeystrokeEvent]) -> bool {
        let digest = fingerprint(events);
        let now = self.clock.now();
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.retain(|_, at| now - *at <= self.window);

        if seen.contains_key(&digest) {
            tracing::warn!("replayed keystroke sample rejected");
            return false;
        }
        seen.insert(digest, now);
        true
    }

    /// Fingerprints currently remembered.
    pub fn tracked(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
