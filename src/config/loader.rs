//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{BackendConfig, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Default location checked when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ddos-gateway/config.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {message}")]
    Env { var: String, message: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the startup configuration.
///
/// An explicit path must exist. Without one, the default path is used when
/// present and built-in defaults otherwise. Environment overrides are applied
/// last and the result is validated again.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)?
            } else {
                GatewayConfig::default()
            }
        }
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the supported environment overrides using `lookup` to read variables.
///
/// - `BACKEND_TARGETS`: JSON list of `{host, port, priority}` objects
/// - `DASHBOARD_URL`, `ENABLE_DASHBOARD_LOGGING`
/// - `GATEWAY_HOST`, `GATEWAY_PORT`
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("BACKEND_TARGETS") {
        let targets: Vec<BackendConfig> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Env {
                var: "BACKEND_TARGETS".into(),
                message: e.to_string(),
            })?;
        config.backends = targets;
    }

    if let Some(url) = lookup("DASHBOARD_URL") {
        config.telemetry.dashboard_url = url;
    }

    if let Some(flag) = lookup("ENABLE_DASHBOARD_LOGGING") {
        config.telemetry.enabled = flag.trim().eq_ignore_ascii_case("true");
    }

    let host = lookup("GATEWAY_HOST");
    let port = lookup("GATEWAY_PORT");
    if host.is_some() || port.is_some() {
        let (current_host, current_port) = config
            .gateway
            .bind_address
            .rsplit_once(':')
            .map(|(h, p)| (h.to_string(), p.to_string()))
            .unwrap_or_else(|| (config.gateway.bind_address.clone(), "8000".to_string()));

        let port = match port {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Env {
                    var: "GATEWAY_PORT".into(),
                    message: e.to_string(),
                })?
                .to_string(),
            None => current_port,
        };
        let host = host.unwrap_or(current_host);
        config.gateway.bind_address = format!("{host}:{port}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let raw = r#"
            [[backends]]
            host = "10.0.0.5"
            port = 8080

            [[backends]]
            host = "api.example.com"
            port = 443
            priority = 0

            [detection]
            threshold = 0.5
        "#;
        let config: GatewayConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[0].priority, 1);
        assert_eq!(config.backends[1].priority, 0);
        assert_eq!(config.detection.threshold, 0.5);
        assert_eq!(config.detection.window_size_secs, 300);
        assert_eq!(config.health_check.path, "/health");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn env_overrides_replace_targets_and_listener() {
        let mut config = GatewayConfig::default();
        let lookup = lookup_from(&[
            ("BACKEND_TARGETS", r#"[{"host":"a.internal","port":9000,"priority":2}]"#),
            ("DASHBOARD_URL", "http://dash:8001"),
            ("ENABLE_DASHBOARD_LOGGING", "FALSE"),
            ("GATEWAY_PORT", "9999"),
        ]);

        apply_env_overrides(&mut config, lookup).unwrap();

        assert_eq!(
            config.backends,
            vec![BackendConfig {
                host: "a.internal".into(),
                port: 9000,
                priority: 2
            }]
        );
        assert_eq!(config.telemetry.dashboard_url, "http://dash:8001");
        assert!(!config.telemetry.enabled);
        assert_eq!(config.gateway.bind_address, "0.0.0.0:9999");
    }

    #[test]
    fn malformed_targets_are_rejected() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, lookup_from(&[("BACKEND_TARGETS", "[oops")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref var, .. } if var == "BACKEND_TARGETS"));
    }

    #[test]
    fn missing_explicit_file_is_an_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
