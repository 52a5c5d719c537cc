pub mod brokers;
pub mod dashboard;
pub mod config;

use std::sync::Arc;
use std::time::Instant;
use crate::brokers::topology::TopologyManager;
use crate::dashboard::models::system::{SystemSnapshot, Totals};
use crate::config::Config;

// ========================================
// ENGINE
// ========================================

/// Handle shared by every dashboard handler.
/// Cheap to clone (all fields are Arcs or Copy).
#[derive(Clone)]
pub struct BrokerScope {
    pub topology: Arc<TopologyManager>,
    pub start_time: Instant,
}

impl BrokerScope {
    pub fn new(config: &Config) -> Self {
        Self {
            topology: Arc::new(TopologyManager::new(config.topology.clone())),
            start_time: Instant::now(),
        }
    }

    pub fn system_snapshot(&self) -> SystemSnapshot {
        let data = self.topology.snapshot();
        SystemSnapshot {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            server_time: chrono::Utc::now().to_rfc3339(),
            totals: Totals::of(&data),
            data,
        }
    }
}
