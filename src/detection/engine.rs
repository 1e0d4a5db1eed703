//! The detection engine.
//!
//! # Responsibilities
//! - Short-circuit blocked clients
//! - Score each request from its features and the client's history
//! - Record the request into the client's sliding window
//! - Raise alerts and (optionally) block clients that cross the threshold

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::DetectionConfig;
use crate::detection::alerts::{AlertRecord, AlertRing};
use crate::detection::blocklist::{BlockedClient, Blocklist};
use crate::detection::features::{self, ClientSignals, FeatureVector};
use crate::detection::history::{ClientRecord, RequestSnapshot};
use crate::http::context::RequestContext;

/// Errors raised while scoring a request.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("non-finite {signal} signal for {client_ip}: {value}")]
    NonFiniteSignal {
        client_ip: String,
        signal: &'static str,
        value: f64,
    },
}

/// Classification of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "DDoS")]
    Ddos,
    #[serde(rename = "BLOCKED")]
    Blocked,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Normal => "NORMAL",
            Verdict::Ddos => "DDoS",
            Verdict::Blocked => "BLOCKED",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analyzing one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub verdict: Verdict,
    /// Anomaly score in [0, 1].
    pub score: f64,
    /// Features behind the score; absent for blocked clients.
    pub features: Option<FeatureVector>,
}

impl Analysis {
    pub fn normal() -> Self {
        Self {
            verdict: Verdict::Normal,
            score: 0.0,
            features: None,
        }
    }

    fn blocked() -> Self {
        Self {
            verdict: Verdict::Blocked,
            score: 1.0,
            features: None,
        }
    }
}

/// Read-only view of the engine for operators.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionStats {
    pub total_ips: usize,
    pub blocked_ips: usize,
    pub recent_alerts: Vec<AlertRecord>,
    pub window_size: u64,
    pub threshold: f64,
}

/// Per-client DDoS detection.
///
/// Client state and the blocklist are sharded maps keyed by IP, so concurrent
/// requests only contend when they come from the same client.
#[derive(Debug)]
pub struct DetectionEngine {
    config: DetectionConfig,
    clients: DashMap<String, ClientRecord>,
    blocklist: Blocklist,
    alerts: AlertRing,
}

impl DetectionEngine {
    pub fn new(config: DetectionConfig) -> Self {
        tracing::info!(
            window_secs = config.window_size_secs,
            threshold = config.threshold,
            auto_block = config.auto_block,
            "Detection engine initialized"
        );
        Self {
            alerts: AlertRing::new(config.alert_capacity),
            clients: DashMap::new(),
            blocklist: Blocklist::new(),
            config,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    pub fn default_block_duration(&self) -> Duration {
        Duration::from_secs(self.config.block_duration_secs)
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_size_secs)
    }

    /// Analyze a request arriving now.
    pub fn analyze(&self, client_ip: &str, ctx: &RequestContext) -> Result<Analysis, DetectionError> {
        self.analyze_at(client_ip, ctx, Instant::now())
    }

    /// Analyze a request arriving at `now`.
    pub fn analyze_at(
        &self,
        client_ip: &str,
        ctx: &RequestContext,
        now: Instant,
    ) -> Result<Analysis, DetectionError> {
        if self.blocklist.is_blocked(client_ip, now) {
            return Ok(Analysis::blocked());
        }

        let geo_anomaly = match ctx.geo_anomaly {
            Some(value) if !value.is_finite() => {
                return Err(DetectionError::NonFiniteSignal {
                    client_ip: client_ip.to_string(),
                    signal: "geo_anomaly",
                    value,
                })
            }
            Some(value) => value.clamp(0.0, 1.0),
            None => 0.0,
        };

        let mut record = self
            .clients
            .entry(client_ip.to_string())
            .or_insert_with(|| ClientRecord::new(now, self.config.max_tracked_values));

        let arrivals = record.recent_arrivals(now, features::MAX_SERIES);
        let signals = ClientSignals {
            ua_repetition: record.user_agents.repetition(),
            session_age: now.saturating_duration_since(record.first_seen),
            geo_anomaly,
        };
        let features = features::extract(ctx, &arrivals, now, signals);
        let score = features.anomaly_score();
        let verdict = if score > self.config.threshold {
            Verdict::Ddos
        } else {
            Verdict::Normal
        };

        record.record(RequestSnapshot::from(ctx), now, self.window());
        drop(record);

        tracing::debug!(
            client_ip = %client_ip,
            score = score,
            request_rate = features.request_rate,
            iat_variance = features.iat_variance,
            ua_diversity = features.ua_diversity,
            burst = features.burst_detected,
            "Request scored"
        );

        if verdict == Verdict::Ddos {
            tracing::warn!(client_ip = %client_ip, score = score, "DDoS pattern detected");
            self.alerts.push(AlertRecord::new(client_ip, score, features));
            if self.config.auto_block {
                self.block_at(client_ip, self.default_block_duration(), now);
            }
        }

        Ok(Analysis {
            verdict,
            score,
            features: Some(features),
        })
    }

    /// Block `client_ip` for `duration` starting now.
    pub fn block(&self, client_ip: &str, duration: Duration) {
        self.block_at(client_ip, duration, Instant::now());
    }

    pub fn block_at(&self, client_ip: &str, duration: Duration, now: Instant) {
        self.blocklist.block(client_ip, now, duration);
        tracing::info!(
            client_ip = %client_ip,
            duration_secs = duration.as_secs(),
            "Client blocked"
        );
    }

    /// Lift a block immediately. Returns whether the client was blocked.
    pub fn unblock(&self, client_ip: &str) -> bool {
        let removed = self.blocklist.unblock(client_ip);
        if removed {
            tracing::info!(client_ip = %client_ip, "Client unblocked");
        }
        removed
    }

    pub fn is_blocked(&self, client_ip: &str) -> bool {
        self.blocklist.is_blocked(client_ip, Instant::now())
    }

    /// Live blocks with their remaining time.
    pub fn blocked_ips(&self) -> Vec<BlockedClient> {
        self.blocklist.live(Instant::now())
    }

    pub fn stats(&self) -> DetectionStats {
        DetectionStats {
            total_ips: self.clients.len(),
            blocked_ips: self.blocklist.live(Instant::now()).len(),
            recent_alerts: self.alerts.snapshot(),
            window_size: self.config.window_size_secs,
            threshold: self.config.threshold,
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Requests currently inside `client_ip`'s window.
    pub fn window_len(&self, client_ip: &str) -> usize {
        self.clients
            .get(client_ip)
            .map(|record| record.request_count)
            .unwrap_or(0)
    }

    /// Drop idle client records and expired blocks. Returns evicted clients.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let idle_for = Duration::from_secs(self.config.idle_eviction_secs);
        let before = self.clients.len();
        self.clients.retain(|_, record| !record.is_idle(now, idle_for));
        let evicted = before.saturating_sub(self.clients.len());
        let expired = self.blocklist.purge_expired(now);
        if evicted > 0 || expired > 0 {
            tracing::debug!(evicted, expired_blocks = expired, "Idle sweep complete");
        }
        evicted
    }

    /// Periodically evict idle clients until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let interval = Duration::from_secs(self.config.sweep_interval_secs);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.evict_idle(Instant::now());
                    crate::observability::metrics::record_blocked_ips(self.blocklist.len());
                }
                _ = shutdown.recv() => {
                    tracing::info!("Idle sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
