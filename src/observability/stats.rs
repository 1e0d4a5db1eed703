//! Process-wide request counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug)]
pub struct GatewayStats {
    total: AtomicU64,
    allowed: AtomicU64,
    blocked: AtomicU64,
    ddos_detected: AtomicU64,
    started: Instant,
    started_at: DateTime<Utc>,
}

/// Point-in-time copy of [`GatewayStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub allowed_requests: u64,
    pub blocked_requests: u64,
    pub ddos_detected: u64,
    pub start_time: DateTime<Utc>,
    pub uptime_seconds: u64,
}

impl StatsSnapshot {
    /// Share of screened requests that were refused, in percent.
    pub fn block_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.blocked_requests as f64 / self.total_requests as f64 * 100.0
    }

    /// Average screened requests per minute since start.
    pub fn requests_per_minute(&self) -> f64 {
        let minutes = (self.uptime_seconds as f64 / 60.0).max(1.0 / 60.0);
        self.total_requests as f64 / minutes
    }
}

impl GatewayStats {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            ddos_detected: AtomicU64::new(0),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn record_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_allowed(&self) {
        self.allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ddos(&self) {
        self.ddos_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total.load(Ordering::Relaxed),
            allowed_requests: self.allowed.load(Ordering::Relaxed),
            blocked_requests: self.blocked.load(Ordering::Relaxed),
            ddos_detected: self.ddos_detected.load(Ordering::Relaxed),
            start_time: self.started_at,
            uptime_seconds: self.uptime().as_secs(),
        }
    }
}

impl Default for GatewayStats {
    fn default() -> Self {
        Self::new()
    }
}
