use async_trait::async_trait;

use crate::contract::{
    error::RadarError,
    model::{GeoPoint, NearbyUser, UserId, UserLocation},
};

/// Public API of the radar module for in-process consumers.
#[async_trait]
pub trait RadarApi: Send + Sync {
    /// Record the user's position and return the other users currently nearby.
    async fn report_and_scan(
        &self,
        user_id: UserId,
        position: GeoPoint,
    ) -> Result<Vec<NearbyUser>, RadarError>;

    /// Stored location of a user.
    async fn get_location(&self, user_id: UserId) -> Result<UserLocation, RadarError>;
}
