//! Recent detection alerts, kept for operators only.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::detection::features::FeatureVector;

/// Alert ring capacity used when the configuration does not override it.
pub const DEFAULT_ALERT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub score: f64,
    pub features: FeatureVector,
}

impl AlertRecord {
    pub fn new(client_ip: &str, score: f64, features: FeatureVector) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            client_ip: client_ip.to_string(),
            score,
            features,
        }
    }
}

/// Fixed-capacity ring; the oldest alert is dropped when full.
#[derive(Debug)]
pub struct AlertRing {
    alerts: Mutex<VecDeque<AlertRecord>>,
    capacity: usize,
}

impl AlertRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            alerts: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, alert: AlertRecord) {
        let mut alerts = self.alerts.lock().expect("alert ring mutex poisoned");
        if alerts.len() == self.capacity {
            alerts.pop_front();
        }
        alerts.push_back(alert);
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<AlertRecord> {
        self.alerts
            .lock()
            .expect("alert ring mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().expect("alert ring mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AlertRing {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}
