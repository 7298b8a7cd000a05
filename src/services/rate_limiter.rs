//! Per-address login throttling.
//!
//! Each client address accumulates failed login attempts. After
//! [`FREE_ATTEMPTS`] failures every further attempt must wait
//! `BASE_DELAY × 2^(failures - FREE_ATTEMPTS)` since the last failure, with the
//! exponent capped at [`MAX_SHIFT`] (1s, 2s, 4s, … 512s). A successful login
//! drops the counter; the periodic sweep drops counters that went idle.
//!
//! State is process-local and lost on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::constants::login::{BASE_DELAY, FREE_ATTEMPTS, MAX_SHIFT};

#[derive(Debug, Clone, Copy)]
struct LoginAttempt {
    failures: u32,
    last_failure: Instant,
}

impl LoginAttempt {
    fn backoff(self) -> Duration {
        if self.failures < FREE_ATTEMPTS {
            return Duration::ZERO;
        }
        let shift = (self.failures - FREE_ATTEMPTS).min(MAX_SHIFT);
        BASE_DELAY * (1u32 << shift)
    }
}

/// The whole map sits behind one lock so concurrent failures from the same
/// address never lose an increment.
#[derive(Debug, Default)]
pub struct LoginLimiter {
    attempts: Mutex<HashMap<String, LoginAttempt>>,
}

impl LoginLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, LoginAttempt>> {
        // A panic while holding the lock cannot leave a half-written entry behind
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How long `address` must wait before the next attempt; zero if it may try now.
    #[must_use]
    pub fn cooldown(&self, address: &str) -> Duration {
        self.cooldown_at(address, Instant::now())
    }

    #[must_use]
    pub fn cooldown_at(&self, address: &str, now: Instant) -> Duration {
        let attempts = self.lock();
        let Some(attempt) = attempts.get(address) else {
            return Duration::ZERO;
        };

        let elapsed = now.saturating_duration_since(attempt.last_failure);
        attempt.backoff().saturating_sub(elapsed)
    }

    /// Call once per failed verification, never on success.
    pub fn record_failure(&self, address: &str) {
        self.record_failure_at(address, Instant::now());
    }

    pub fn record_failure_at(&self, address: &str, now: Instant) {
        let mut attempts = self.lock();
        attempts
            .entry(address.to_string())
            .and_modify(|attempt| {
                attempt.failures = attempt.failures.saturating_add(1);
                attempt.last_failure = now;
            })
            .or_insert(LoginAttempt {
                failures: 1,
                last_failure: now,
            });
    }

    /// Forget every failure recorded for `address`.
    pub fn reset(&self, address: &str) {
        self.lock().remove(address);
    }

    /// Drops counters whose last failure is older than `max_idle`. Returns how many were removed.
    pub fn sweep(&self, max_idle: Duration) -> usize {
        self.sweep_at(max_idle, Instant::now())
    }

    pub fn sweep_at(&self, max_idle: Duration, now: Instant) -> usize {
        let mut attempts = self.lock();
        let before = attempts.len();
        attempts.retain(|_, attempt| now.saturating_duration_since(attempt.last_failure) <= max_idle);
        before - attempts.len()
    }

    #[must_use]
    pub fn failure_count(&self, address: &str) -> u32 {
        self.lock().get(address).map_or(0, |attempt| attempt.failures)
    }

    #[must_use]
    pub fn tracked_addresses(&self) -> usize {
        self.lock().len()
    }
}
