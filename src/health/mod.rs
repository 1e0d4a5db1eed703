//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic loop (active.rs):
//!     Check every backend concurrently
//!     → join all checks
//!     → Backend::record_check (healthy flag, failure counter)
//!     → sleep, or exit on shutdown
//! ```
//!
//! # Design Decisions
//! - One check result flips the state; there is no flap damping
//! - Check failures never stop the loop
//! - Health state is per-backend and read lock-free by selection

pub mod active;

pub use active::HealthMonitor;
