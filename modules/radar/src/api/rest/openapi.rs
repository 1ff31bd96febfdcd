use problem::{Problem, ValidationError};
use utoipa::OpenApi;

use crate::api::rest::dto::{
    NearbyUserDto, ScanResponseDto, UpdateLocationReq, UserIdDto, UserLocationDto,
};
use crate::api::rest::handlers;

#[derive(OpenApi)]
#[openapi(
    info(title = "Radar API", description = "Proximity radar: report positions, find users nearby"),
    paths(handlers::update_location, handlers::get_location),
    components(schemas(
        UpdateLocationReq,
        UserIdDto,
        ScanResponseDto,
        NearbyUserDto,
        UserLocationDto,
        Problem,
        ValidationError
    )),
    tags((name = "radar", description = "Location reports and proximity scans"))
)]
pub struct RadarApiDoc;
