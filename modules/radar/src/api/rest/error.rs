use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use problem::{ErrDef, Problem, ProblemResponse, ValidationError};

use crate::domain::error::DomainError;

pub const VALIDATION: ErrDef = ErrDef {
    status: 400,
    title: "Validation error",
    code: "RADAR_VALIDATION",
    type_url: "https://errors.radar.dev/RADAR_VALIDATION",
};

pub const NOT_FOUND: ErrDef = ErrDef {
    status: 404,
    title: "Location not found",
    code: "RADAR_NOT_FOUND",
    type_url: "https://errors.radar.dev/RADAR_NOT_FOUND",
};

pub const STORE_UNAVAILABLE: ErrDef = ErrDef {
    status: 500,
    title: "Internal error",
    code: "RADAR_STORE_UNAVAILABLE",
    type_url: "https://errors.radar.dev/RADAR_STORE_UNAVAILABLE",
};

/// Request context echoed into every problem.
pub struct ProblemCtx<'a> {
    pub instance: &'a str,
    pub request_id: Option<&'a str>,
}

impl<'a> ProblemCtx<'a> {
    pub fn new(instance: &'a str, headers: &'a HeaderMap) -> Self {
        Self {
            instance,
            request_id: headers.get("x-request-id").and_then(|v| v.to_str().ok()),
        }
    }

    fn finish(&self, problem: Problem) -> ProblemResponse {
        let problem = problem.with_instance(self.instance);
        match self.request_id {
            Some(id) => ProblemResponse(problem.with_request_id(id)),
            None => ProblemResponse(problem),
        }
    }
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, ctx: &ProblemCtx<'_>) -> ProblemResponse {
    match e {
        DomainError::Validation { field, message } => ctx.finish(
            VALIDATION
                .to_problem(format!("{field}: {message}"))
                .with_errors(vec![ValidationError {
                    detail: message.clone(),
                    pointer: format!("/{field}"),
                }]),
        ),
        DomainError::LocationNotFound { user_id } => ctx.finish(
            NOT_FOUND.to_problem(format!("No location stored for user '{user_id}'")),
        ),
        // The service already logged the cause; clients only get a generic detail.
        DomainError::StoreUnavailable { .. } => {
            ctx.finish(STORE_UNAVAILABLE.to_problem("The location store is currently unavailable"))
        }
    }
}

/// Body that is not JSON, or JSON of the wrong shape.
pub fn map_json_rejection(rejection: &JsonRejection, ctx: &ProblemCtx<'_>) -> ProblemResponse {
    ctx.finish(VALIDATION.to_problem(format!("Malformed request body: {}", rejection.body_text())))
}

/// Required fields absent from an otherwise well-formed body.
pub fn missing_fields(fields: &[&str], ctx: &ProblemCtx<'_>) -> ProblemResponse {
    let errors = fields
        .iter()
        .map(|f| ValidationError {
            detail: "field is required".to_string(),
            pointer: format!("/{f}"),
        })
        .collect();
    ctx.finish(
        VALIDATION
            .to_problem(format!("Missing required field(s): {}", fields.join(", ")))
            .with_errors(errors),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::UserId;

    #[test]
    fn store_failure_hides_internal_message() {
        let headers = HeaderMap::new();
        let ctx = ProblemCtx::new("/api/v1/update-location", &headers);
        let e = DomainError::store_unavailable("upsert", "connection refused by 10.0.0.5");

        let resp = map_domain_error(&e, &ctx);
        assert_eq!(resp.0.status, 500);
        assert_eq!(resp.0.code, "RADAR_STORE_UNAVAILABLE");
        assert!(!resp.0.detail.contains("10.0.0.5"));
        assert_eq!(resp.0.instance, "/api/v1/update-location");
    }

    #[test]
    fn validation_points_at_field() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "rid-7".parse().unwrap());
        let ctx = ProblemCtx::new("/x", &headers);
        let e = DomainError::validation("latitude", "out of range");

        let resp = map_domain_error(&e, &ctx);
        assert_eq!(resp.0.status, 400);
        assert_eq!(resp.0.request_id.as_deref(), Some("rid-7"));
        let errors = resp.0.errors.unwrap();
        assert_eq!(errors[0].pointer, "/latitude");
    }

    #[test]
    fn not_found_maps_to_404() {
        let headers = HeaderMap::new();
        let ctx = ProblemCtx::new("/x", &headers);
        let resp = map_domain_error(&DomainError::location_not_found(UserId::from("u")), &ctx);
        assert_eq!(resp.0.status, 404);
        assert_eq!(resp.0.code, "RADAR_NOT_FOUND");
    }
}
