use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;

/// Raw token strings revoked before their natural expiry.
///
/// Every entry carries the instant after which it may be forgotten. Stale
/// entries are dropped on lookup and by [`TokenBlacklist::purge_expired`],
/// so the set never outgrows the tokens that could still verify.
#[derive(Debug, Default)]
pub struct TokenBlacklist {
    entries: DashMap<String, Instant>,
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke `token` for `retain_for`. Re-inserting keeps the later removal instant.
    pub fn insert(&self, token: &str, retain_for: Duration) {
        self.insert_at(token, retain_for, Instant::now());
    }

    pub fn insert_at(&self, token: &str, retain_for: Duration, now: Instant) {
        let remove_at = now + retain_for;

        self.entries
            .entry(token.to_string())
            .and_modify(|existing| {
                if *existing < remove_at {
                    *existing = remove_at;
                }
            })
            .or_insert(remove_at);
    }

    pub fn contains(&self, token: &str) -> bool {
        self.contains_at(token, Instant::now())
    }

    pub fn contains_at(&self, token: &str, now: Instant) -> bool {
        self.entries.remove_if(token, |_, remove_at| *remove_at <= now);
        self.entries.contains_key(token)
    }

    /// Drop every entry whose retention has elapsed.
    ///
    /// # Returns
    /// Number of entries removed
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, remove_at| *remove_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
