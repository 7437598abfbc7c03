//! Abuse guards applied before an authentication attempt is scored.
//!
//! Both guards keep process-wide state behind a `Mutex` and are meant to be
//! shared through `Arc`. Windows slide per entry, so a burst straddling a window
//! boundary can admit up to twice `max_attempts` in a short span.

pub mod clock;
pub mod rate_limit;
pub mod replay;

pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limit::RateLimiter;
pub use replay::{fingerprint, Fingerprint, ReplayGuard};
