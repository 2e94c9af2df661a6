//! Wall-clock abstraction.
//!
//! Freshness and rate-limit validation compare wire timestamps against "now".
//! Protocol logic never reads the system clock directly; it goes through
//! [`Clock`], implemented once for production ([`SystemClock`]) and once for
//! deterministic tests ([`ManualClock`]). This keeps boundary conditions —
//! a frame aged exactly to the freshness window, a decode attempt one
//! microsecond inside the rate limit — exactly reproducible.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use quietwire_proto::WireTimestamp;

/// Source of the current wall-clock time.
pub trait Clock {
    /// The current time as a wire timestamp.
    fn now(&self) -> WireTimestamp;
}

/// Production clock backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> WireTimestamp {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64());
        WireTimestamp::from_secs_f64(secs)
    }
}

/// Settable clock for tests and simulation harnesses.
///
/// Clones share the same underlying instant, so a test can hold one handle
/// while the encoder and decoder hold others.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Create a clock pinned at `secs` seconds since the Unix epoch.
    #[must_use]
    pub fn new(secs: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(secs)),
        }
    }

    /// Pin the clock to an absolute time.
    pub fn set(&self, secs: f64) {
        *self.lock() = secs;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, delta: Duration) {
        *self.lock() += delta.as_secs_f64();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, f64> {
        self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> WireTimestamp {
        WireTimestamp::from_secs_f64(*self.lock())
    }
}
