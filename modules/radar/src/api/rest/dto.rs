use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::contract::model::{NearbyUser, UserId, UserLocation};

/// Fixed message of a successful scan.
pub const SCAN_COMPLETE_MESSAGE: &str = "Radar scan complete";

/// User id as clients send it: a string, or a non-negative integer.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(untagged)]
pub enum UserIdDto {
    Text(String),
    Number(u64),
}

impl From<UserIdDto> for UserId {
    fn from(dto: UserIdDto) -> Self {
        match dto {
            UserIdDto::Text(s) => UserId::new(s),
            UserIdDto::Number(n) => UserId::new(n.to_string()),
        }
    }
}

/// Body of `POST /api/v1/update-location`.
///
/// Fields are optional at the serde level so that a missing field is reported
/// as a field-level validation problem instead of a generic parse failure.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateLocationReq {
    #[schema(required = true)]
    pub user_id: Option<UserIdDto>,
    #[schema(required = true, minimum = -90.0, maximum = 90.0, example = 50.0755)]
    pub latitude: Option<f64>,
    #[schema(required = true, minimum = -180.0, maximum = 180.0, example = 14.4378)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct NearbyUserDto {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_seen: DateTime<Utc>,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ScanResponseDto {
    pub message: String,
    pub nearby_users: Vec<NearbyUserDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UserLocationDto {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_seen: DateTime<Utc>,
}

impl From<NearbyUser> for NearbyUserDto {
    fn from(n: NearbyUser) -> Self {
        Self {
            user_id: n.location.user_id.into_inner(),
            latitude: n.location.position.latitude,
            longitude: n.location.position.longitude,
            last_seen: n.location.last_seen,
            distance_meters: n.distance_meters,
        }
    }
}

impl From<UserLocation> for UserLocationDto {
    fn from(l: UserLocation) -> Self {
        Self {
            user_id: l.user_id.into_inner(),
            latitude: l.position.latitude,
            longitude: l.position.longitude,
            last_seen: l.last_seen,
        }
    }
}

impl ScanResponseDto {
    pub fn new(nearby: Vec<NearbyUser>) -> Self {
        Self {
            message: SCAN_COMPLETE_MESSAGE.to_string(),
            nearby_users: nearby.into_iter().map(NearbyUserDto::from).collect(),
        }
    }
}
