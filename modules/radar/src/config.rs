use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceConfig;

/// Configuration for the radar module (`modules.radar`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadarConfig {
    #[serde(default = "default_search_radius_meters")]
    pub search_radius_meters: f64,
    #[serde(default = "default_freshness_window", with = "humantime_serde")]
    pub freshness_window: Duration,
    #[serde(default)]
    pub store: StoreKind,
}

/// Which location store backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Database when one is configured, in-memory otherwise.
    #[default]
    Auto,
    Memory,
    Database,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            search_radius_meters: default_search_radius_meters(),
            freshness_window: default_freshness_window(),
            store: StoreKind::default(),
        }
    }
}

fn default_search_radius_meters() -> f64 {
    5_000.0
}

fn default_freshness_window() -> Duration {
    Duration::from_secs(15 * 60)
}

impl RadarConfig {
    /// Reject configurations that would make every scan empty or meaningless.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.search_radius_meters.is_finite() || self.search_radius_meters <= 0.0 {
            anyhow::bail!(
                "modules.radar.search_radius_meters must be a positive number, got {}",
                self.search_radius_meters
            );
        }
        if self.freshness_window.is_zero() {
            anyhow::bail!("modules.radar.freshness_window must be greater than zero");
        }
        if chrono::Duration::from_std(self.freshness_window).is_err() {
            anyhow::bail!("modules.radar.freshness_window is too large");
        }
        Ok(())
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            search_radius_meters: self.search_radius_meters,
            freshness_window: self.freshness_window,
        }
    }
}
