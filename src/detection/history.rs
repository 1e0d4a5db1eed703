//! Per-client sliding window state.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::http::context::RequestContext;

/// The part of a request kept in a client's window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
    pub user_agent: String,
}

impl From<&RequestContext> for RequestSnapshot {
    fn from(ctx: &RequestContext) -> Self {
        Self {
            method: ctx.method.clone(),
            path: ctx.path.clone(),
            user_agent: ctx.user_agent.clone(),
        }
    }
}

/// Frequency counter that remembers at most `capacity` distinct values.
///
/// Values seen after the table is full still count toward the total and are
/// treated as distinct.
#[derive(Debug, Clone)]
pub struct BoundedCounter {
    counts: HashMap<String, u64>,
    capacity: usize,
    overflow: u64,
    total: u64,
}

impl BoundedCounter {
    pub fn new(capacity: usize) -> Self {
        Self {
            counts: HashMap::new(),
            capacity,
            overflow: 0,
            total: 0,
        }
    }

    pub fn observe(&mut self, value: &str) {
        self.total += 1;
        if let Some(count) = self.counts.get_mut(value) {
            *count += 1;
        } else if self.counts.len() < self.capacity {
            self.counts.insert(value.to_string(), 1);
        } else {
            self.overflow += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn distinct(&self) -> u64 {
        self.counts.len() as u64 + self.overflow
    }

    /// `1 - distinct / total`, or `None` before the first observation.
    pub fn repetition(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(1.0 - self.distinct() as f64 / self.total as f64)
    }
}

/// Everything the engine remembers about one client IP.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    window: VecDeque<(RequestSnapshot, Instant)>,
    pub first_seen: Instant,
    pub last_seen: Instant,
    /// Requests currently inside the window.
    pub request_count: usize,
    pub user_agents: BoundedCounter,
    pub paths: BoundedCounter,
}

impl ClientRecord {
    pub fn new(now: Instant, max_tracked_values: usize) -> Self {
        Self {
            window: VecDeque::new(),
            first_seen: now,
            last_seen: now,
            request_count: 0,
            user_agents: BoundedCounter::new(max_tracked_values),
            paths: BoundedCounter::new(max_tracked_values),
        }
    }

    /// The newest `limit - 1` retained arrivals followed by `now`.
    ///
    /// Walks the window from the back, so the cost does not depend on how
    /// much history is retained.
    pub fn recent_arrivals(&self, now: Instant, limit: usize) -> Vec<Instant> {
        let mut arrivals: Vec<Instant> = self
            .window
            .iter()
            .rev()
            .take(limit.saturating_sub(1))
            .map(|(_, at)| *at)
            .collect();
        arrivals.reverse();
        arrivals.push(now);
        arrivals
    }

    /// Append a request, drop entries older than `window`, update aggregates.
    pub fn record(&mut self, snapshot: RequestSnapshot, now: Instant, window: Duration) {
        self.prune(now, window);
        self.user_agents.observe(&snapshot.user_agent);
        self.paths.observe(&snapshot.path);
        self.window.push_back((snapshot, now));
        self.last_seen = now;
        self.request_count = self.window.len();
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some((_, at)) = self.window.front() {
            if now.saturating_duration_since(*at) >= window {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn is_idle(&self, now: Instant, idle_for: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > idle_for
    }

    pub fn recent(&self) -> impl Iterator<Item = &RequestSnapshot> {
        self.window.iter().map(|(snapshot, _)| snapshot)
    }
}
