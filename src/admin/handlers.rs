use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::detection::DetectionStats;
use crate::http::server::AppState;
use crate::observability::StatsSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct BackendStatus {
    pub url: String,
    pub priority: u32,
    pub health: bool,
    pub failures: u32,
    pub requests_handled: u64,
}

#[derive(Serialize)]
pub struct BackendList {
    pub total_targets: usize,
    pub targets: Vec<BackendStatus>,
}

#[derive(Serialize)]
pub struct GatewayReport {
    pub statistics: StatsSnapshot,
    pub backend_distribution: BTreeMap<String, u64>,
    pub backend_health: BTreeMap<String, bool>,
    pub backend_failures: BTreeMap<String, u32>,
    pub detection: DetectionStats,
    pub blocked_ips: Vec<String>,
    pub telemetry_sent: u64,
    pub telemetry_failed: u64,
}

#[derive(Serialize)]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub allowed_requests: u64,
    pub blocked_requests: u64,
    pub ddos_detected: u64,
    pub block_rate: String,
    pub uptime_seconds: u64,
    pub requests_per_minute: f64,
    pub blocked_ips_count: usize,
    pub backend_targets_healthy: usize,
    pub backend_targets_total: usize,
}

#[derive(Serialize)]
pub struct BlockedEntry {
    pub ip: String,
    pub remaining_secs: u64,
    pub duration_secs: u64,
}

#[derive(Deserialize)]
pub struct BlockParams {
    pub duration: Option<u64>,
}

#[derive(Serialize)]
pub struct BlockResponse {
    pub status: &'static str,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        uptime_seconds: state.stats.uptime().as_secs(),
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<GatewayReport> {
    let backends = state.backends.all_backends();
    let (telemetry_sent, telemetry_failed) = state.telemetry.delivery_counts();

    Json(GatewayReport {
        statistics: state.stats.snapshot(),
        backend_distribution: backends.iter().map(|b| (b.url.clone(), b.requests())).collect(),
        backend_health: backends.iter().map(|b| (b.url.clone(), b.is_healthy())).collect(),
        backend_failures: backends.iter().map(|b| (b.url.clone(), b.failures())).collect(),
        detection: state.detector.stats(),
        blocked_ips: state.detector.blocked_ips().into_iter().map(|b| b.ip).collect(),
        telemetry_sent,
        telemetry_failed,
    })
}

pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSummary> {
    let stats = state.stats.snapshot();
    Json(MetricsSummary {
        total_requests: stats.total_requests,
        allowed_requests: stats.allowed_requests,
        blocked_requests: stats.blocked_requests,
        ddos_detected: stats.ddos_detected,
        block_rate: format!("{:.2}%", stats.block_rate()),
        uptime_seconds: stats.uptime_seconds,
        requests_per_minute: stats.requests_per_minute(),
        blocked_ips_count: state.detector.blocked_ips().len(),
        backend_targets_healthy: state.backends.healthy_count(),
        backend_targets_total: state.backends.len(),
    })
}

pub async fn get_backends(State(state): State<AppState>) -> Json<BackendList> {
    let targets: Vec<_> = state
        .backends
        .all_backends()
        .iter()
        .map(|b| BackendStatus {
            url: b.url.clone(),
            priority: b.target.priority,
            health: b.is_healthy(),
            failures: b.failures(),
            requests_handled: b.requests(),
        })
        .collect();

    Json(BackendList {
        total_targets: targets.len(),
        targets,
    })
}

pub async fn get_blocklist(State(state): State<AppState>) -> Json<Vec<BlockedEntry>> {
    Json(
        state
            .detector
            .blocked_ips()
            .into_iter()
            .map(|b| BlockedEntry {
                ip: b.ip,
                remaining_secs: b.remaining.as_secs(),
                duration_secs: b.duration.as_secs(),
            })
            .collect(),
    )
}

pub async fn block_ip(
    State(state): State<AppState>,
    Path(ip): Path<String>,
    Query(params): Query<BlockParams>,
) -> Json<BlockResponse> {
    let duration = params
        .duration
        .map(Duration::from_secs)
        .unwrap_or_else(|| state.detector.default_block_duration());
    state.detector.block(&ip, duration);

    Json(BlockResponse {
        status: "blocked",
        ip,
        duration: Some(duration.as_secs()),
    })
}

pub async fn unblock_ip(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Json<BlockResponse> {
    let removed = state.detector.unblock(&ip);
    Json(BlockResponse {
        status: if removed { "unblocked" } else { "not_blocked" },
        ip,
        duration: None,
    })
}
