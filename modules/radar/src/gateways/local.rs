use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::contract::{
    client::RadarApi,
    error::RadarError,
    model::{GeoPoint, NearbyUser, UserId, UserLocation},
};
use crate::domain::{error::DomainError, service::Service};

/// Local implementation of the RadarApi trait that delegates to the domain service
pub struct RadarLocalClient {
    service: Arc<Service>,
}

impl RadarLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RadarApi for RadarLocalClient {
    async fn report_and_scan(
        &self,
        user_id: UserId,
        position: GeoPoint,
    ) -> Result<Vec<NearbyUser>, RadarError> {
        self.service
            .report_and_scan(&user_id, position.latitude, position.longitude, Utc::now())
            .await
            .map_err(Into::into)
    }

    async fn get_location(&self, user_id: UserId) -> Result<UserLocation, RadarError> {
        self.service.get_location(&user_id).await.map_err(Into::into)
    }
}

impl From<DomainError> for RadarError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation { field, message } => {
                RadarError::validation(format!("{field}: {message}"))
            }
            DomainError::LocationNotFound { user_id } => RadarError::not_found(user_id.into_inner()),
            DomainError::StoreUnavailable { .. } => RadarError::unavailable(),
        }
    }
}
