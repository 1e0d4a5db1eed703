//! Active health checking.
//!
//! # Responsibilities
//! - Periodically check every backend concurrently
//! - Update backend health state based on results
//! - Log state transitions only

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use reqwest::{Client, StatusCode};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::load_balancer::{Backend, BackendManager};
use crate::observability::metrics;

#[derive(Debug, Clone)]
pub struct HealthMonitor {
    backends: Arc<BackendManager>,
    config: HealthCheckConfig,
    client: Client,
}

impl HealthMonitor {
    pub fn new(backends: Arc<BackendManager>, config: HealthCheckConfig) -> Self {
        Self {
            backends,
            config,
            client: Client::new(),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);

        loop {
            self.check_all().await;

            tokio::select! {
                _ = time::sleep(interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Check every backend concurrently and wait for all checks.
    pub async fn check_all(&self) {
        let checks = self.backends.all_backends().iter().map(|backend| {
            let monitor = self.clone();
            let backend = backend.clone();
            tokio::spawn(async move { monitor.health_check(&backend).await })
        });

        for result in join_all(checks).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Health check task failed");
            }
        }
    }

    /// Check one backend and record the outcome. Success iff HTTP 200.
    pub async fn health_check(&self, backend: &Backend) -> bool {
        let url = format!("{}{}", backend.url, self.config.path);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let healthy = match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => {
                let status = response.status();
                if status != StatusCode::OK {
                    tracing::debug!(backend = %backend.url, status = %status, "Health check failed: non-200 status");
                }
                status == StatusCode::OK
            }
            Err(e) => {
                tracing::debug!(backend = %backend.url, error = %e, "Health check failed: request error");
                false
            }
        };

        match backend.record_check(healthy) {
            Some(true) => tracing::info!(backend = %backend.url, "Backend is healthy again"),
            Some(false) => tracing::warn!(
                backend = %backend.url,
                failures = backend.failures(),
                "Backend marked unhealthy"
            ),
            None => {}
        }

        metrics::record_backend_health(&backend.url, backend.is_healthy());
        healthy
    }
}
