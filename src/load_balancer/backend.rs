//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single configured target and its canonical URL
//! - Track health state (healthy flag, consecutive check failures)
//! - Count requests forwarded to it

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use serde::Serialize;
use url::Url;

use crate::config::BackendConfig;

/// Immutable description of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendTarget {
    pub host: String,
    pub port: u16,
    pub priority: u32,
}

impl BackendTarget {
    pub fn scheme(&self) -> &'static str {
        if self.port == 443 {
            "https"
        } else {
            "http"
        }
    }

    /// `{scheme}://{host}:{port}`, without a trailing slash.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

impl From<&BackendConfig> for BackendTarget {
    fn from(config: &BackendConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            priority: config.priority,
        }
    }
}

impl fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    pub target: BackendTarget,
    /// Canonical base URL, checked once at construction.
    pub url: String,
    healthy: AtomicBool,
    failures: AtomicU32,
    requests: AtomicU64,
}

impl Backend {
    /// Create a backend. Starts healthy with no failures.
    pub fn new(target: BackendTarget) -> Result<Self, url::ParseError> {
        let url = target.url();
        Url::parse(&url)?;
        Ok(Self {
            target,
            url,
            healthy: AtomicBool::new(true),
            failures: AtomicU32::new(0),
            requests: AtomicU64::new(0),
        })
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Count a forwarded request.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Apply a health check result.
    ///
    /// Returns the new health flag if it changed, `None` otherwise.
    pub fn record_check(&self, success: bool) -> Option<bool> {
        if success {
            self.failures.store(0, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        let was_healthy = self.healthy.swap(success, Ordering::Relaxed);
        (was_healthy != success).then_some(success)
    }
}
