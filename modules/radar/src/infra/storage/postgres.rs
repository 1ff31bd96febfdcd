use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::contract::model::{GeoPoint, UserId, UserLocation};
use crate::domain::repo::{LocationRepository, LocationUpsert, RadiusQuery};

const UPSERT_SQL: &str = "\
INSERT INTO user_locations (user_id, latitude, longitude, last_seen, location)
VALUES ($1, $2, $3, $4, ST_SetSRID(ST_MakePoint($3, $2), 4326)::geography)
ON CONFLICT (user_id) DO UPDATE SET
    latitude = EXCLUDED.latitude,
    longitude = EXCLUDED.longitude,
    last_seen = EXCLUDED.last_seen,
    location = EXCLUDED.location";

// Sphere mode (use_spheroid = false) stays close to the domain's haversine;
// the domain re-checks the exact radius on every row.
const WITHIN_SQL: &str = "\
SELECT user_id, latitude, longitude, last_seen
FROM user_locations
WHERE user_id <> $1
  AND last_seen >= $2
  AND ST_DWithin(
        location,
        ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography,
        $5,
        false)";

const FIND_SQL: &str = "\
SELECT user_id, latitude, longitude, last_seen
FROM user_locations
WHERE user_id = $1";

/// PostGIS lets `ST_DWithin` see a little farther than the exact radius so
/// sphere-radius differences never hide a qualifying row.
const RADIUS_SLACK_METERS: f64 = 1.0;

type Row = (String, f64, f64, DateTime<Utc>);

/// PostgreSQL/PostGIS adapter backed by a GiST-indexed geography column.
#[derive(Clone)]
pub struct PgLocationRepository {
    pool: PgPool,
}

impl PgLocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_location((user_id, latitude, longitude, last_seen): Row) -> UserLocation {
    UserLocation {
        user_id: UserId::new(user_id),
        position: GeoPoint::new(latitude, longitude),
        last_seen,
    }
}

fn describe(e: sqlx::Error) -> anyhow::Error {
    anyhow::anyhow!(db::errors::describe(&e))
}

#[async_trait]
impl LocationRepository for PgLocationRepository {
    async fn upsert(&self, user_id: &UserId, upsert: LocationUpsert) -> anyhow::Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(user_id.as_str())
            .bind(upsert.position.latitude)
            .bind(upsert.position.longitude)
            .bind(upsert.last_seen)
            .execute(&self.pool)
            .await
            .map_err(describe)?;
        Ok(())
    }

    async fn find_within(&self, query: &RadiusQuery) -> anyhow::Result<Vec<UserLocation>> {
        let rows = sqlx::query_as::<_, Row>(WITHIN_SQL)
            .bind(query.exclude.as_str())
            .bind(query.seen_since)
            .bind(query.center.longitude)
            .bind(query.center.latitude)
            .bind(query.radius_meters * (1.0 + 1e-6) + RADIUS_SLACK_METERS)
            .fetch_all(&self.pool)
            .await
            .map_err(describe)?;
        Ok(rows.into_iter().map(into_location).collect())
    }

    async fn find(&self, user_id: &UserId) -> anyhow::Result<Option<UserLocation>> {
        let row = sqlx::query_as::<_, Row>(FIND_SQL)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(describe)?;
        Ok(row.map(into_location))
    }
}
