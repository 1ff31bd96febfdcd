use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument};

use crate::contract::model::{NearbyUser, UserId, UserLocation};
use crate::domain::error::DomainError;
use crate::domain::query::QueryEngine;
use crate::domain::repo::LocationRepository;
use crate::domain::updater::{validate_user_id, LocationUpdater};

/// Domain service: location reporting and proximity scans.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn LocationRepository>,
    updater: LocationUpdater,
    engine: QueryEngine,
    config: ServiceConfig,
}

/// Scan parameters fixed per deployment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub search_radius_meters: f64,
    pub freshness_window: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            search_radius_meters: 5_000.0,
            freshness_window: Duration::from_secs(15 * 60),
        }
    }
}

impl Service {
    pub fn new(repo: Arc<dyn LocationRepository>, config: ServiceConfig) -> Self {
        Self {
            updater: LocationUpdater::new(repo.clone()),
            engine: QueryEngine::new(repo.clone()),
            repo,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[instrument(
        name = "radar.service.update_location",
        skip(self),
        fields(user_id = %user_id)
    )]
    pub async fn update_location(
        &self,
        user_id: &UserId,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<UserLocation, DomainError> {
        self.updater
            .update(user_id, latitude, longitude, now)
            .await
            .inspect_err(log_store_failure)
    }

    #[instrument(
        name = "radar.service.query_nearby",
        skip(self),
        fields(user_id = %user_id)
    )]
    pub async fn query_nearby(
        &self,
        user_id: &UserId,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
        radius_meters: f64,
        freshness_window: Duration,
    ) -> Result<Vec<NearbyUser>, DomainError> {
        self.engine
            .query(
                user_id,
                latitude,
                longitude,
                now,
                radius_meters,
                freshness_window,
            )
            .await
            .inspect_err(log_store_failure)
    }

    /// Record the position, then scan with the configured radius and window.
    /// Nothing is queried when the update fails.
    #[instrument(
        name = "radar.service.report_and_scan",
        skip(self),
        fields(user_id = %user_id)
    )]
    pub async fn report_and_scan(
        &self,
        user_id: &UserId,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<NearbyUser>, DomainError> {
        debug!("Reporting location");
        let stored = self.update_location(user_id, latitude, longitude, now).await?;

        let nearby = self
            .query_nearby(
                user_id,
                stored.position.latitude,
                stored.position.longitude,
                now,
                self.config.search_radius_meters,
                self.config.freshness_window,
            )
            .await?;

        info!(nearby = nearby.len(), "Radar scan complete");
        Ok(nearby)
    }

    #[instrument(
        name = "radar.service.get_location",
        skip(self),
        fields(user_id = %user_id)
    )]
    pub async fn get_location(&self, user_id: &UserId) -> Result<UserLocation, DomainError> {
        validate_user_id(user_id)?;
        self.repo
            .find(user_id)
            .await
            .map_err(|e| DomainError::store_unavailable("find", e))
            .inspect_err(log_store_failure)?
            .ok_or_else(|| DomainError::location_not_found(user_id.clone()))
    }
}

fn log_store_failure(e: &DomainError) {
    if let DomainError::StoreUnavailable { operation, message } = e {
        error!(operation, error = %message, "Location store failure");
    }
}
