//! Process-wide admission control for model API calls.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Spaces admissions at least `interval` apart.
///
/// Each caller reserves the next free slot under a short lock and then waits
/// for it outside the lock, so concurrent callers queue in arrival order
/// without polling. Share one gate across missions via `Arc`.
#[derive(Debug)]
pub struct CooldownGate {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl CooldownGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until this caller may issue a call.
    ///
    /// A slot reserved by a caller that is then cancelled stays consumed.
    pub async fn admit(&self) {
        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}
