//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request path and background tasks produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → stats.rs (process counters served by the admin API)
//!     → telemetry.rs (per-request records for the dashboard)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//!     → Admin API
//!     → Analytics dashboard (best effort)
//! ```
//!
//! # Design Decisions
//! - Metrics and counters are atomic increments
//! - Telemetry never blocks or fails a request

pub mod logging;
pub mod metrics;
pub mod stats;
pub mod telemetry;

pub use stats::{GatewayStats, StatsSnapshot};
pub use telemetry::{TelemetryDispatcher, TelemetryRecord};
