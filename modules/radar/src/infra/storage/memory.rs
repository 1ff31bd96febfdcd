use async_trait::async_trait;
use dashmap::DashMap;

use crate::contract::model::{UserId, UserLocation};
use crate::domain::geo::haversine_meters;
use crate::domain::repo::{LocationRepository, LocationUpsert, RadiusQuery};

/// Process-local store. Each upsert replaces the whole record under the
/// shard's write lock, so readers never observe a half-applied update.
#[derive(Default)]
pub struct InMemoryLocationRepository {
    rows: DashMap<UserId, UserLocation>,
}

impl InMemoryLocationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl LocationRepository for InMemoryLocationRepository {
    async fn upsert(&self, user_id: &UserId, upsert: LocationUpsert) -> anyhow::Result<()> {
        self.rows.insert(
            user_id.clone(),
            UserLocation {
                user_id: user_id.clone(),
                position: upsert.position,
                last_seen: upsert.last_seen,
            },
        );
        Ok(())
    }

    async fn find_within(&self, query: &RadiusQuery) -> anyhow::Result<Vec<UserLocation>> {
        Ok(self
            .rows
            .iter()
            .filter(|entry| {
                let loc = entry.value();
                loc.user_id != query.exclude
                    && loc.last_seen >= query.seen_since
                    && haversine_meters(query.center, loc.position) <= query.radius_meters
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find(&self, user_id: &UserId) -> anyhow::Result<Option<UserLocation>> {
        Ok(self.rows.get(user_id).map(|entry| entry.value().clone()))
    }
}
