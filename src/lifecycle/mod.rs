//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → listeners stop accepting and drain
//!               → health monitor and idle sweeper exit their loops
//! ```
//!
//! # Design Decisions
//! - One broadcast channel shared by every background task
//! - Startup order lives in `main`: config, logging, metrics, listeners

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
