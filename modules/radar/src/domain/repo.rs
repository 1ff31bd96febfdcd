use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contract::model::{GeoPoint, UserId, UserLocation};

/// Fields written together by an upsert; the store never sees one without the other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationUpsert {
    pub position: GeoPoint,
    pub last_seen: DateTime<Utc>,
}

/// Radius + recency lookup around a point.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusQuery {
    pub center: GeoPoint,
    pub radius_meters: f64,
    /// Oldest acceptable `last_seen` (inclusive).
    pub seen_since: DateTime<Utc>,
    /// Record never returned, normally the requester.
    pub exclude: UserId,
}

/// Port for the domain layer: the spatial store.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Create or replace the single record for `user_id` in one indivisible write.
    async fn upsert(&self, user_id: &UserId, upsert: LocationUpsert) -> anyhow::Result<()>;

    /// Records within `radius_meters` of `center`, seen at or after `seen_since`,
    /// other than `exclude`. Adapters may over-approximate the radius.
    async fn find_within(&self, query: &RadiusQuery) -> anyhow::Result<Vec<UserLocation>>;

    /// Load the record for a user.
    async fn find(&self, user_id: &UserId) -> anyhow::Result<Option<UserLocation>>;
}
