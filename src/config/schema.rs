//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound listener settings.
    pub gateway: ListenerConfig,

    /// Backend targets admitted traffic is balanced across.
    pub backends: Vec<BackendConfig>,

    /// Detection engine tuning.
    pub detection: DetectionConfig,

    /// Active health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Analytics collaborator settings.
    pub telemetry: TelemetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Path answered locally without detection or forwarding.
    pub health_path: String,

    /// Largest inbound body buffered for forwarding, in bytes.
    pub max_body_size: usize,

    /// Identifier reported to the analytics collaborator.
    /// Defaults to `gateway-{bind_address}`.
    pub gateway_id: Option<String>,
}

impl ListenerConfig {
    pub fn gateway_id(&self) -> String {
        self.gateway_id
            .clone()
            .unwrap_or_else(|| format!("gateway-{}", self.bind_address))
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            health_path: "/health".to_string(),
            max_body_size: 10 * 1024 * 1024,
            gateway_id: None,
        }
    }
}

/// Backend target definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Hostname or IP of the target.
    pub host: String,

    /// Port; 443 selects https, anything else http.
    pub port: u16,

    /// Lower values are tried first and act as the fail-open fallback.
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    1
}

/// Detection engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Sliding window retained per client, in seconds.
    pub window_size_secs: u64,

    /// Anomaly score above which a request is classified as DDoS.
    pub threshold: f64,

    /// Block duration used for automatic blocks and manual blocks without
    /// an explicit duration.
    pub block_duration_secs: u64,

    /// Block a client as soon as one of its requests crosses the threshold.
    pub auto_block: bool,

    /// Capacity of the recent alert ring.
    pub alert_capacity: usize,

    /// Distinct user agents / paths remembered per client.
    pub max_tracked_values: usize,

    /// Client records idle for longer than this are evicted.
    pub idle_eviction_secs: u64,

    /// How often the idle-client sweep runs.
    pub sweep_interval_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_size_secs: 300,
            threshold: 0.35,
            block_duration_secs: 600,
            auto_block: true,
            alert_capacity: 1000,
            max_tracked_values: 256,
            idle_eviction_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Path requested on each backend.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            timeout_secs: 5,
            path: "/health".to_string(),
        }
    }
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for a forwarded request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Analytics collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Send a log record for every screened request.
    pub enabled: bool,

    /// Base URL of the dashboard; records go to `{dashboard_url}/api/logs`.
    pub dashboard_url: String,

    /// Per-record delivery timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dashboard_url: "http://127.0.0.1:8001".to_string(),
            timeout_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Operator API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the operator API.
    pub enabled: bool,

    /// Bearer token required on every admin call, if set.
    pub api_key: Option<String>,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
