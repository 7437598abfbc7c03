//! Per-identity sliding-window attempt limiter.

use super::clock::{Clock, SystemClock};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Attempts = HashMap<String, VecDeque<DateTime<Utc>>>;

pub struct RateLimiter {
    max_attempts: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    attempts: Mutex<Attempts>,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window_secs: u64) -> Self {
        Self::with_clock(max_attempts, window_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(max_attempts: u32, window_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_attempts,
            window: Duration::seconds(window_secs as i64),
            clock,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn pruned(&self, now: DateTime<Utc>) -> MutexGuard<'_, Attempts> {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        attempts.retain(|_, times| {
            while times.front().is_some_and(|t| now - *t >= self.window) {
                times.pop_front();
            }
            !times.is_empty()
        });
        attempts
    }

    fn count_in(attempts: &Attempts, identity: &str) -> u32 {
        attempts.get(identity).map_or(0, |t| t.len() as u32)
    }

    pub fn is_allowed(&self, identity: &str) -> bool {
        let attempts = self.pruned(self.clock.now());
        Self::count_in(&attempts, identity) < self.max_attempts
    }

    pub fn record_attempt(&self, identity: &str) {
        let now = self.clock.now();
        let mut attempts = self.pruned(now);
        attempts.entry(identity.to_string()).or_default().push_back(now);
    }

    /// Attempts left in the current window; never negative.
    pub fn remaining(&self, identity: &str) -> u32 {
        let attempts = self.pruned(self.clock.now());
        self.max_attempts
            .saturating_sub(Self::count_in(&attempts, identity))
    }

    /// Check and record in one step. Returns `false`, recording nothing, when
    /// the identity is already at its limit.
    pub fn try_acquire(&self, identity: &str) -> bool {
        let now = self.clock.now();
        let mut attempts = self.pruned(now);
        if Self::count_in(&attempts, identity) >= self.max_attempts {
            tracing::warn!(identity, max = self.max_attempts, "rate limit exceeded");
            return false;
        }
        attempts.entry(identity.to_string()).or_default().push_back(now);
        true
    }
}
