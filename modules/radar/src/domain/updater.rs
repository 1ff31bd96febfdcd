use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::debug;

use crate::contract::model::{UserId, UserLocation};
use crate::domain::error::DomainError;
use crate::domain::geo::validate_position;
use crate::domain::repo::{LocationRepository, LocationUpsert};

/// Validates and persists a single user's position.
#[derive(Clone)]
pub struct LocationUpdater {
    repo: Arc<dyn LocationRepository>,
}

impl LocationUpdater {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    /// Create or replace the user's record with `position` and `last_seen = now`.
    ///
    /// Timestamps are stored at millisecond precision, the coarsest any adapter keeps.
    pub async fn update(
        &self,
        user_id: &UserId,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<UserLocation, DomainError> {
        validate_user_id(user_id)?;
        let position = validate_position(latitude, longitude)?;
        let last_seen = now.trunc_subsecs(3);

        self.repo
            .upsert(
                user_id,
                LocationUpsert {
                    position,
                    last_seen,
                },
            )
            .await
            .map_err(|e| DomainError::store_unavailable("upsert", e))?;

        debug!("Location stored");
        Ok(UserLocation {
            user_id: user_id.clone(),
            position,
            last_seen,
        })
    }
}

pub(crate) fn validate_user_id(user_id: &UserId) -> Result<(), DomainError> {
    if user_id.is_empty() {
        return Err(DomainError::validation("user_id", "must not be empty"));
    }
    Ok(())
}
