use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    http::{HeaderMap, Uri},
    response::Json,
    Extension,
};
use chrono::Utc;
use problem::{Problem, ProblemResponse};
use tracing::{info, warn};

use crate::api::rest::dto::{ScanResponseDto, UpdateLocationReq, UserLocationDto};
use crate::api::rest::error::{map_domain_error, map_json_rejection, missing_fields, ProblemCtx};
use crate::contract::model::UserId;
use crate::domain::service::Service;

/// Report the caller's position and list other users nearby
#[utoipa::path(
    post,
    path = "/api/v1/update-location",
    tag = "radar",
    operation_id = "radar.update_location",
    request_body = UpdateLocationReq,
    responses(
        (status = 200, description = "Position stored; nearby users listed", body = ScanResponseDto),
        (status = 400, description = "Invalid request", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Location store failure", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn update_location(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    headers: HeaderMap,
    payload: Result<Json<UpdateLocationReq>, JsonRejection>,
) -> Result<Json<ScanResponseDto>, ProblemResponse> {
    let ctx = ProblemCtx::new(uri.path(), &headers);

    let Json(req) = payload.map_err(|rejection| {
        warn!("Rejected update-location body: {}", rejection.body_text());
        map_json_rejection(&rejection, &ctx)
    })?;

    let (user_id, latitude, longitude) = match (req.user_id, req.latitude, req.longitude) {
        (Some(id), Some(lat), Some(lon)) => (UserId::from(id), lat, lon),
        (id, lat, lon) => {
            let missing: Vec<&str> = [
                ("user_id", id.is_none()),
                ("latitude", lat.is_none()),
                ("longitude", lon.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            return Err(missing_fields(&missing, &ctx));
        }
    };

    info!("Location report from user {}", user_id);

    match svc
        .report_and_scan(&user_id, latitude, longitude, Utc::now())
        .await
    {
        Ok(nearby) => Ok(Json(ScanResponseDto::new(nearby))),
        Err(e) => {
            warn!("Failed to report location for {}: {}", user_id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Get the stored location of a user
#[utoipa::path(
    get,
    path = "/api/v1/locations/{user_id}",
    tag = "radar",
    operation_id = "radar.get_location",
    params(("user_id" = String, Path, description = "Opaque user identifier")),
    responses(
        (status = 200, description = "Stored location", body = UserLocationDto),
        (status = 404, description = "No location stored", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Location store failure", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn get_location(
    Extension(svc): Extension<Arc<Service>>,
    Path(user_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Json<UserLocationDto>, ProblemResponse> {
    let ctx = ProblemCtx::new(uri.path(), &headers);
    let user_id = UserId::new(user_id);

    match svc.get_location(&user_id).await {
        Ok(location) => Ok(Json(UserLocationDto::from(location))),
        Err(e) => Err(map_domain_error(&e, &ctx)),
    }
}
