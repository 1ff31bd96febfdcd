use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::contract::model::{GeoPoint, UserId, UserLocation};
use crate::domain::geo::{haversine_meters, BoundingBox};
use crate::domain::repo::{LocationRepository, LocationUpsert, RadiusQuery};

const UPSERT_SQL: &str = "\
INSERT INTO user_locations (user_id, latitude, longitude, last_seen_ms)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT (user_id) DO UPDATE SET
    latitude = excluded.latitude,
    longitude = excluded.longitude,
    last_seen_ms = excluded.last_seen_ms";

const WITHIN_BOX_SQL: &str = "\
SELECT user_id, latitude, longitude, last_seen_ms
FROM user_locations
WHERE user_id <> ?1
  AND last_seen_ms >= ?2
  AND latitude BETWEEN ?3 AND ?4
  AND longitude BETWEEN ?5 AND ?6";

const WITHIN_BAND_SQL: &str = "\
SELECT user_id, latitude, longitude, last_seen_ms
FROM user_locations
WHERE user_id <> ?1
  AND last_seen_ms >= ?2
  AND latitude BETWEEN ?3 AND ?4";

const FIND_SQL: &str = "\
SELECT user_id, latitude, longitude, last_seen_ms
FROM user_locations
WHERE user_id = ?1";

type Row = (String, f64, f64, i64);

/// SQLite adapter. SQLite has no spatial index here, so the radius query
/// narrows rows with an indexed bounding box and finishes with haversine.
#[derive(Clone)]
pub struct SqliteLocationRepository {
    pool: SqlitePool,
}

impl SqliteLocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn into_location((user_id, latitude, longitude, last_seen_ms): Row) -> anyhow::Result<UserLocation> {
    let last_seen = DateTime::<Utc>::from_timestamp_millis(last_seen_ms)
        .with_context(|| format!("invalid last_seen_ms {last_seen_ms} for user '{user_id}'"))?;
    Ok(UserLocation {
        user_id: UserId::new(user_id),
        position: GeoPoint::new(latitude, longitude),
        last_seen,
    })
}

fn describe(e: sqlx::Error) -> anyhow::Error {
    anyhow::anyhow!(db::errors::describe(&e))
}

#[async_trait]
impl LocationRepository for SqliteLocationRepository {
    async fn upsert(&self, user_id: &UserId, upsert: LocationUpsert) -> anyhow::Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(user_id.as_str())
            .bind(upsert.position.latitude)
            .bind(upsert.position.longitude)
            .bind(upsert.last_seen.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(describe)?;
        Ok(())
    }

    async fn find_within(&self, query: &RadiusQuery) -> anyhow::Result<Vec<UserLocation>> {
        let bbox = BoundingBox::around(query.center, query.radius_meters);

        let base = if bbox.spans_all_longitudes() {
            sqlx::query_as::<_, Row>(WITHIN_BAND_SQL)
        } else {
            sqlx::query_as::<_, Row>(WITHIN_BOX_SQL)
        };
        let mut q = base
            .bind(query.exclude.as_str())
            .bind(query.seen_since.timestamp_millis())
            .bind(bbox.min_latitude)
            .bind(bbox.max_latitude);
        if !bbox.spans_all_longitudes() {
            q = q.bind(bbox.min_longitude).bind(bbox.max_longitude);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(describe)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let location = into_location(row)?;
            if haversine_meters(query.center, location.position) <= query.radius_meters {
                out.push(location);
            }
        }
        Ok(out)
    }

    async fn find(&self, user_id: &UserId) -> anyhow::Result<Option<UserLocation>> {
        let row = sqlx::query_as::<_, Row>(FIND_SQL)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(describe)?;
        row.map(into_location).transpose()
    }
}
