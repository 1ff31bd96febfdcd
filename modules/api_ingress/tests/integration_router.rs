//! Router-level tests for the operational endpoints and the middleware stack.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::post,
    Router,
};
use tower::util::ServiceExt;
use utoipa::OpenApi;

use api_ingress::{ApiIngress, ApiIngressConfig};

#[derive(OpenApi)]
#[openapi(info(title = "Test API", version = "0.0.1"))]
struct TestDoc;

fn ingress(config: ApiIngressConfig) -> ApiIngress {
    ApiIngress::new(config).with_openapi(&TestDoc::openapi()).unwrap()
}

async fn get(router: Router, uri: &str) -> axum::response::Response {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let router = ingress(ApiIngressConfig::default()).build_router(Router::new());
    let response = get(router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn openapi_document_is_served_when_enabled() {
    let router = ingress(ApiIngressConfig::default()).build_router(Router::new());
    let response = get(router, "/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["info"]["title"], "Test API");
    assert!(json["openapi"].as_str().unwrap().starts_with("3."));
}

#[tokio::test]
async fn docs_are_hidden_when_disabled() {
    let config = ApiIngressConfig {
        enable_docs: false,
        ..Default::default()
    };
    let router = ingress(config).build_router(Router::new());
    assert_eq!(get(router.clone(), "/openapi.json").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(router, "/docs").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let config = ApiIngressConfig {
        body_limit_bytes: 16,
        ..Default::default()
    };
    let routes = Router::new().route("/echo", post(|body: String| async move { body }));
    let router = ingress(config).build_router(routes);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .body(Body::from("x".repeat(64)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

async fn get_with_origin(router: Router, uri: &str) -> axum::response::Response {
    router
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("origin", "https://app.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn cross_origin_requests_are_allowed_by_default() {
    let router = ingress(ApiIngressConfig::default()).build_router(Router::new());
    let response = get_with_origin(router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn cors_headers_absent_when_disabled() {
    let config = ApiIngressConfig {
        cors_enabled: false,
        ..Default::default()
    };
    let router = ingress(config).build_router(Router::new());
    let response = get_with_origin(router, "/health").await;
    assert!(!response
        .headers()
        .contains_key("access-control-allow-origin"));
}
