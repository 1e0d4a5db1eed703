//! Client blocklist.
//!
//! Entries expire lazily: an expired entry is removed by the first lookup
//! that notices it, or by [`Blocklist::purge_expired`].

use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    blocked_at: Instant,
    duration: Duration,
}

impl BlockEntry {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.blocked_at) < self.duration
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.blocked_at))
    }
}

/// A live block as reported to operators.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockedClient {
    pub ip: String,
    pub remaining: Duration,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct Blocklist {
    entries: DashMap<String, BlockEntry>,
}

impl Blocklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `ip` is blocked at `now`, dropping an expired entry.
    pub fn is_blocked(&self, ip: &str, now: Instant) -> bool {
        let live = match self.entries.get(ip) {
            Some(entry) => entry.is_live(now),
            None => return false,
        };
        if !live {
            self.entries.remove_if(ip, |_, entry| !entry.is_live(now));
        }
        live
    }

    /// Block `ip` from `now` for `duration`, replacing any existing entry.
    pub fn block(&self, ip: &str, now: Instant, duration: Duration) {
        self.entries.insert(
            ip.to_string(),
            BlockEntry {
                blocked_at: now,
                duration,
            },
        );
    }

    /// Remove `ip` regardless of elapsed time. Returns whether it was present.
    pub fn unblock(&self, ip: &str) -> bool {
        self.entries.remove(ip).is_some()
    }

    /// Live entries, sorted by IP.
    pub fn live(&self, now: Instant) -> Vec<BlockedClient> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| entry.is_live(now))
            .map(|entry| BlockedClient {
                ip: entry.key().clone(),
                remaining: entry.remaining(now),
                duration: entry.duration,
            })
            .collect();
        out.sort_by(|a, b| a.ip.cmp(&b.ip));
        out
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
