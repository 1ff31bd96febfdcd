use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::debug;

use crate::contract::model::{GeoPoint, NearbyUser, UserId, UserLocation};
use crate::domain::error::DomainError;
use crate::domain::geo::{haversine_meters, validate_position};
use crate::domain::repo::{LocationRepository, RadiusQuery};
use crate::domain::updater::validate_user_id;

/// The qualifying rules for a proximity scan, applied to every candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityFilter {
    pub center: GeoPoint,
    pub radius_meters: f64,
    pub seen_since: DateTime<Utc>,
    pub exclude: UserId,
}

impl ProximityFilter {
    /// Distance to `candidate` if it is someone else, fresh enough and within the radius.
    pub fn matches(&self, candidate: &UserLocation) -> Option<f64> {
        if candidate.user_id == self.exclude || candidate.last_seen < self.seen_since {
            return None;
        }
        let distance = haversine_meters(self.center, candidate.position);
        (distance <= self.radius_meters).then_some(distance)
    }

    /// Store-side form of the filter. Stored timestamps are whole milliseconds,
    /// so the recency bound is rounded up to the next one.
    pub fn to_query(&self) -> RadiusQuery {
        RadiusQuery {
            center: self.center,
            radius_meters: self.radius_meters,
            seen_since: ceil_to_millis(self.seen_since),
            exclude: self.exclude.clone(),
        }
    }
}

/// Finds the other users near a position.
#[derive(Clone)]
pub struct QueryEngine {
    repo: Arc<dyn LocationRepository>,
}

impl QueryEngine {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    /// Users other than `user_id` within `radius_meters` of the position whose
    /// `last_seen` is no older than `freshness_window` before `now`.
    ///
    /// Results are sorted by distance, nearest first.
    pub async fn query(
        &self,
        user_id: &UserId,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
        radius_meters: f64,
        freshness_window: Duration,
    ) -> Result<Vec<NearbyUser>, DomainError> {
        validate_user_id(user_id)?;
        let center = validate_position(latitude, longitude)?;
        let filter = build_filter(user_id, center, now, radius_meters, freshness_window)?;

        let candidates = self
            .repo
            .find_within(&filter.to_query())
            .await
            .map_err(|e| DomainError::store_unavailable("find_within", e))?;
        let scanned = candidates.len();

        let mut nearby: Vec<NearbyUser> = candidates
            .into_iter()
            .filter_map(|location| {
                filter.matches(&location).map(|distance_meters| NearbyUser {
                    location,
                    distance_meters,
                })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

        debug!(scanned, matched = nearby.len(), "Proximity filter applied");
        Ok(nearby)
    }
}

fn build_filter(
    user_id: &UserId,
    center: GeoPoint,
    now: DateTime<Utc>,
    radius_meters: f64,
    freshness_window: Duration,
) -> Result<ProximityFilter, DomainError> {
    if !radius_meters.is_finite() || radius_meters < 0.0 {
        return Err(DomainError::validation(
            "radius_meters",
            format!("must be a finite, non-negative number, got {radius_meters}"),
        ));
    }
    let window = chrono::Duration::from_std(freshness_window)
        .map_err(|_| DomainError::validation("freshness_window", "window is too large"))?;
    let seen_since = now
        .checked_sub_signed(window)
        .ok_or_else(|| DomainError::validation("freshness_window", "window is too large"))?;

    Ok(ProximityFilter {
        center,
        radius_meters,
        seen_since,
        exclude: user_id.clone(),
    })
}

fn ceil_to_millis(t: DateTime<Utc>) -> DateTime<Utc> {
    let floor = t.trunc_subsecs(3);
    if floor < t {
        floor + chrono::Duration::milliseconds(1)
    } else {
        floor
    }
}
