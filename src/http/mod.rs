//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, orchestrator)
//!     → context.rs (normalize request for detection)
//!     → [detection engine verdict]
//!     → [load balancer picks backend]
//!     → forward.rs (outbound call, header hygiene, error mapping)
//!     → Send to client
//! ```

pub mod context;
pub mod forward;
pub mod server;

pub use context::RequestContext;
pub use forward::{ForwardError, Forwarder};
pub use server::{AppState, HttpServer};
