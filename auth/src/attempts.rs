use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;

/// Lockout threshold and sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    failures: u32,
    last_failure_at: Instant,
}

impl AttemptRecord {
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_failure_at) >= window
    }
}

/// Counts failed logins per client identifier.
///
/// An identifier with no record is clean. Each failure pushes the window
/// forward from the failure time; once `max_attempts` failures sit inside
/// the window the identifier is locked until the window elapses after the
/// last failure. A record whose window has elapsed is treated as clean and
/// removed the next time it is touched.
#[derive(Debug)]
pub struct LoginAttemptTracker {
    policy: LockoutPolicy,
    records: DashMap<String, AttemptRecord>,
}

impl LoginAttemptTracker {
    pub fn new(policy: LockoutPolicy) -> Self {
        Self {
            policy,
            records: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Record a failed attempt.
    ///
    /// # Returns
    /// Failure count inside the current window, including this one
    pub fn record_failure(&self, id: &str) -> u32 {
        self.record_failure_at(id, Instant::now())
    }

    pub fn record_failure_at(&self, id: &str, now: Instant) -> u32 {
        let window = self.policy.window;
        let mut record = self
            .records
            .entry(id.to_string())
            .or_insert(AttemptRecord {
                failures: 0,
                last_failure_at: now,
            });

        if record.is_stale(now, window) {
            record.failures = 0;
        }

        record.failures = record.failures.saturating_add(1);
        record.last_failure_at = now;
        record.failures
    }

    /// Count an attempt before it is judged, unless `id` is locked.
    ///
    /// The lock check and the increment happen under one entry lock, so
    /// concurrent attempts never get past `max_attempts` inside a window.
    /// A successful attempt is followed by [`clear_on_success`]; an attempt
    /// that could not be judged is handed back with [`release_attempt`].
    ///
    /// [`clear_on_success`]: Self::clear_on_success
    /// [`release_attempt`]: Self::release_attempt
    ///
    /// # Errors
    /// Remaining lockout time when `id` is already locked
    pub fn reserve_attempt(&self, id: &str) -> Result<u32, Duration> {
        self.reserve_attempt_at(id, Instant::now())
    }

    pub fn reserve_attempt_at(&self, id: &str, now: Instant) -> Result<u32, Duration> {
        let window = self.policy.window;
        let mut record = self
            .records
            .entry(id.to_string())
            .or_insert(AttemptRecord {
                failures: 0,
                last_failure_at: now,
            });

        if record.is_stale(now, window) {
            record.failures = 0;
        }

        if record.failures >= self.policy.max_attempts {
            let elapsed = now.saturating_duration_since(record.last_failure_at);
            return Err(window.saturating_sub(elapsed));
        }

        record.failures = record.failures.saturating_add(1);
        record.last_failure_at = now;
        Ok(record.failures)
    }

    /// Undo one reservation made by [`reserve_attempt`](Self::reserve_attempt).
    pub fn release_attempt(&self, id: &str) {
        if let Some(mut record) = self.records.get_mut(id) {
            record.failures = record.failures.saturating_sub(1);
        }
    }

    pub fn is_locked(&self, id: &str) -> bool {
        self.is_locked_at(id, Instant::now())
    }

    pub fn is_locked_at(&self, id: &str, now: Instant) -> bool {
        self.retry_after_at(id, now).is_some()
    }

    /// Time left until a locked identifier may try again.
    ///
    /// # Returns
    /// `None` when the identifier is not locked
    pub fn retry_after(&self, id: &str) -> Option<Duration> {
        self.retry_after_at(id, Instant::now())
    }

    pub fn retry_after_at(&self, id: &str, now: Instant) -> Option<Duration> {
        let window = self.policy.window;
        self.records
            .remove_if(id, |_, record| record.is_stale(now, window));

        let record = self.records.get(id)?;
        if record.failures < self.policy.max_attempts {
            return None;
        }

        let elapsed = now.saturating_duration_since(record.last_failure_at);
        Some(window.saturating_sub(elapsed))
    }

    /// Forget all failures for `id` after a successful authentication.
    pub fn clear_on_success(&self, id: &str) {
        self.records.remove(id);
    }

    /// Drop records whose window has elapsed.
    ///
    /// # Returns
    /// Number of records removed
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let window = self.policy.window;
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_stale(now, window));
        before.saturating_sub(self.records.len())
    }

    pub fn tracked(&self) -> usize {
        self.records.len()
    }
}

impl Default for LoginAttemptTracker {
    fn default() -> Self {
        Self::new(LockoutPolicy::default())
    }
}
