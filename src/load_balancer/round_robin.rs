//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
/// Stores an internal counter to rotate through backends.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    /// Advances the cursor once per inspected backend and returns the first
    /// healthy one, so a skipped backend's turn passes to the next in line
    /// instead of doubling up on it. With every backend down, falls back to
    /// the first one.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let first = backends.first()?;
        let len = backends.len();

        for _ in 0..len {
            let idx = self.counter.fetch_add(1, Ordering::Relaxed) % len;
            let backend = &backends[idx];
            if backend.is_healthy() {
                return Some(backend.clone());
            }
        }
        tracing::debug!(backend = %first.url, "No healthy backends, failing open");
        Some(first.clone())
    }
}
