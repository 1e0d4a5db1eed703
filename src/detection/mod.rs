//! Per-client DDoS detection.
//!
//! # Data Flow
//! ```text
//! RequestContext + client IP
//!     → blocklist.rs (short-circuit blocked clients)
//!     → history.rs (sliding window, user agent / path counters)
//!     → features.rs (feature vector, weighted anomaly score)
//!     → engine.rs (verdict, alert ring, auto-block)
//! ```
//!
//! # Design Decisions
//! - State is keyed by client IP in sharded maps; no global lock
//! - Scoring for one IP happens under that IP's entry lock, so concurrent
//!   requests from the same client are serialized
//! - Time is passed in explicitly (`analyze_at`) so scoring is deterministic
//! - A blocked request is answered without touching the client's history

pub mod alerts;
pub mod blocklist;
pub mod engine;
pub mod features;
pub mod history;

pub use alerts::{AlertRecord, AlertRing};
pub use blocklist::{BlockedClient, Blocklist};
pub use engine::{Analysis, DetectionEngine, DetectionError, DetectionStats, Verdict};
pub use features::FeatureVector;
