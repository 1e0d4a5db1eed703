//! Backend pool management.
//!
//! # Responsibilities
//! - Build backends from configuration, ordered by priority
//! - Apply the load balancing algorithm to select a backend
//! - Expose backends for health checking and reporting

use std::sync::Arc;

use crate::config::BackendConfig;
use crate::load_balancer::{
    backend::{Backend, BackendTarget},
    round_robin::RoundRobin,
    LoadBalancer,
};

/// Owns the configured backends and the selection strategy.
#[derive(Debug)]
pub struct BackendManager {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
}

impl BackendManager {
    /// Create a new backend manager from configuration.
    ///
    /// Targets are stably sorted by ascending priority; that order is both
    /// the rotation order and the fail-open fallback.
    pub fn new(configs: Vec<BackendConfig>) -> Self {
        let mut targets: Vec<BackendTarget> = configs.iter().map(BackendTarget::from).collect();
        targets.sort_by_key(|target| target.priority);

        let mut backends = Vec::with_capacity(targets.len());
        for target in targets {
            match Backend::new(target.clone()) {
                Ok(backend) => backends.push(Arc::new(backend)),
                Err(e) => tracing::warn!(backend = %target, error = %e, "Invalid backend target"),
            }
        }

        tracing::info!(count = backends.len(), "Backend manager initialized");
        Self {
            backends,
            balancer: Box::new(RoundRobin::new()),
        }
    }

    /// Select the backend for the next request.
    pub fn next_target(&self) -> Option<Arc<Backend>> {
        self.balancer.next_server(&self.backends)
    }

    /// All backends in selection order.
    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn healthy_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_healthy()).count()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
