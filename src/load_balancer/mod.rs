//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request
//!     → pool.rs (priority-ordered targets)
//!     → round_robin.rs (rotate, skip unhealthy, fail open)
//!     → backend.rs (target URL, health flag, counters)
//!     → forwarder
//! ```
//!
//! # Design Decisions
//! - Targets are fixed at startup; only health and counters change
//! - Health is written by the health check loop alone, read by selection
//! - Selection never refuses while at least one target is configured

use std::sync::Arc;

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::{Backend, BackendTarget};
pub use pool::BackendManager;
pub use round_robin::RoundRobin;

/// Strategy for picking the next backend from an ordered list.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}
