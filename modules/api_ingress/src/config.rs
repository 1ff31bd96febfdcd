use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP ingress configuration, read from `modules.api_ingress`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiIngressConfig {
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub bind_addr: String,
    /// Serve `/openapi.json` and the `/docs` page.
    pub enable_docs: bool,
    pub cors_enabled: bool,
    /// Per-request handler timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Maximum accepted request body, in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            enable_docs: true,
            cors_enabled: true,
            request_timeout: Duration::from_secs(30),
            body_limit_bytes: 16 * 1024 * 1024,
        }
    }
}
