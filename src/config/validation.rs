//! Configuration validation.
//!
//! Serde handles the syntax; this module checks value ranges and addresses.
//! Every problem is reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "gateway.bind_address", &config.gateway.bind_address);
    if !config.gateway.health_path.starts_with('/') {
        errors.push(ValidationError::new("gateway.health_path", "must start with '/'"));
    } else if config.gateway.health_path == "/" || config.gateway.health_path.contains('{') {
        errors.push(ValidationError::new(
            "gateway.health_path",
            "must be a fixed path other than '/'",
        ));
    }
    if config.gateway.max_body_size == 0 {
        errors.push(ValidationError::new("gateway.max_body_size", "must be greater than 0"));
    }

    for (i, backend) in config.backends.iter().enumerate() {
        if backend.host.trim().is_empty() {
            errors.push(ValidationError::new(format!("backends[{i}].host"), "must not be empty"));
        }
        if backend.port == 0 {
            errors.push(ValidationError::new(format!("backends[{i}].port"), "must not be 0"));
        }
    }

    let detection = &config.detection;
    if !(0.0..=1.0).contains(&detection.threshold) {
        errors.push(ValidationError::new("detection.threshold", "must be within [0, 1]"));
    }
    if detection.window_size_secs == 0 {
        errors.push(ValidationError::new("detection.window_size_secs", "must be greater than 0"));
    }
    if detection.block_duration_secs == 0 {
        errors.push(ValidationError::new("detection.block_duration_secs", "must be greater than 0"));
    }
    if detection.alert_capacity == 0 {
        errors.push(ValidationError::new("detection.alert_capacity", "must be greater than 0"));
    }
    if detection.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("detection.sweep_interval_secs", "must be greater than 0"));
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be greater than 0"));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::new("health_check.timeout_secs", "must be greater than 0"));
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.telemetry.enabled && url::Url::parse(&config.telemetry.dashboard_url).is_err() {
        errors.push(ValidationError::new("telemetry.dashboard_url", "is not a valid URL"));
    }

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_socket_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("'{value}' is not a socket address")));
    }
}
