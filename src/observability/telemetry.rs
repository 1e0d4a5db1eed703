//! Fire-and-forget delivery of request records to the analytics dashboard.
//!
//! Each record is posted from its own spawned task with its own timeout.
//! Nothing here is awaited by the request path, and failures end at a debug
//! log line.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;

use crate::config::TelemetryConfig;
use crate::detection::Verdict;

/// One screened request as reported to the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TelemetryRecord {
    pub timestamp: String,
    pub source_ip: String,
    pub request_path: String,
    pub request_method: String,
    pub user_agent: String,
    pub prediction: Verdict,
    pub confidence_score: f64,
    pub is_blocked: u8,
    pub response_status_code: u16,
    pub response_time_ms: f64,
    pub gateway_id: String,
}

impl TelemetryRecord {
    /// `is_blocked` is derived from the verdict.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_ip: &str,
        request_path: &str,
        request_method: &str,
        user_agent: &str,
        prediction: Verdict,
        confidence_score: f64,
        response_status_code: u16,
        response_time: Duration,
        gateway_id: &str,
    ) -> Self {
        let is_blocked = matches!(prediction, Verdict::Ddos | Verdict::Blocked);
        Self {
            timestamp: Utc::now().to_rfc3339(),
            source_ip: source_ip.to_string(),
            request_path: request_path.to_string(),
            request_method: request_method.to_string(),
            user_agent: user_agent.to_string(),
            prediction,
            confidence_score,
            is_blocked: u8::from(is_blocked),
            response_status_code,
            response_time_ms: response_time.as_secs_f64() * 1000.0,
            gateway_id: gateway_id.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct DeliveryCounters {
    sent: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct TelemetryDispatcher {
    client: Client,
    /// `None` when telemetry is disabled.
    endpoint: Option<String>,
    timeout: Duration,
    counters: Arc<DeliveryCounters>,
}

impl TelemetryDispatcher {
    pub fn new(config: &TelemetryConfig) -> Self {
        let endpoint = config.enabled.then(|| {
            format!("{}/api/logs", config.dashboard_url.trim_end_matches('/'))
        });
        Self {
            client: Client::new(),
            endpoint,
            timeout: Duration::from_millis(config.timeout_ms),
            counters: Arc::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Queue `record` for delivery and return immediately.
    pub fn dispatch(&self, record: TelemetryRecord) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        let client = self.client.clone();
        let timeout = self.timeout;
        let counters = self.counters.clone();

        tokio::spawn(async move {
            let result = client
                .post(&endpoint)
                .json(&record)
                .timeout(timeout)
                .send()
                .await
                .and_then(|response| response.error_for_status());
            match result {
                Ok(_) => {
                    counters.sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(error = %e, "Failed to send log to dashboard");
                }
            }
        });
    }

    /// Records delivered and records lost so far.
    pub fn delivery_counts(&self) -> (u64, u64) {
        (
            self.counters.sent.load(Ordering::Relaxed),
            self.counters.failed.load(Ordering::Relaxed),
        )
    }
}
