use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

use crate::api::rest::handlers;
use crate::domain::service::Service;

pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route("/api/v1/update-location", post(handlers::update_location))
        .route("/api/v1/locations/{user_id}", get(handlers::get_location))
        .layer(Extension(service))
}
