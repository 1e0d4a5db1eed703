//! DDoS-screening reverse gateway library.

pub mod admin;
pub mod config;
pub mod detection;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use detection::DetectionEngine;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
