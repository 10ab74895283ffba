//! Admin endpoint handlers.
//!
//! None of these touch the queue. `/metrics` reads the shared counters and
//! `/post` only logs what it receives.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::metrics::RelayMetrics;
use crate::web::auth::{is_auth_enabled, verify_bearer};

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub metrics: RelayMetrics,
    pub bearer_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(metrics: RelayMetrics, bearer_token: Option<String>) -> Self {
        let bearer_token = if is_auth_enabled(&bearer_token) {
            bearer_token.map(Arc::from)
        } else {
            None
        };

        Self {
            metrics,
            bearer_token,
        }
    }
}

/// Build the admin router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/post", any(post_sink))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

// =============================================================================
// Metrics
// =============================================================================

/// Prometheus text exposition of the relay counters.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "metrics_render_failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// =============================================================================
// Debug Sink
// =============================================================================

/// Debug sink for inbound POST traffic.
///
/// The token is checked before the method, so an unauthenticated GET is
/// answered with 403 rather than 405.
pub async fn post_sink(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(expected) = state.bearer_token.as_deref() {
        if !verify_bearer(&headers, expected) {
            warn!("post_invalid_authorization");
            return (StatusCode::FORBIDDEN, "403 - Invalid bearer token");
        }
    }

    if method != Method::POST {
        warn!(method = %method, "post_invalid_method");
        return (StatusCode::METHOD_NOT_ALLOWED, "405 - Method not allowed");
    }

    info!(
        body_length = body.len(),
        body = %String::from_utf8_lossy(&body),
        "post_body_received"
    );

    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::metrics::MetricsSink;

    fn app(token: Option<&str>) -> (Router, RelayMetrics) {
        let metrics = RelayMetrics::new().unwrap();
        let state = AppState::new(metrics.clone(), token.map(str::to_string));
        (router(state), metrics)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn request(method: &str, uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::from("{\"ping\":true}")).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_unauthenticated() {
        let (app, _) = app(Some("secret"));
        let (status, body) = send(app, request("GET", "/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_metrics_exposes_counters() {
        let (app, metrics) = app(None);
        metrics.increment_received(4);
        metrics.increment_error();

        let response = app
            .oneshot(request("GET", "/metrics", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            METRICS_CONTENT_TYPE
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("events_received_total 4"));
        assert!(body.contains("events_forward_error_total 1"));
    }

    #[tokio::test]
    async fn test_post_without_token_configured() {
        let (app, _) = app(None);
        let (status, body) = send(app, request("POST", "/post", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_post_with_valid_token() {
        let (app, _) = app(Some("secret"));
        let (status, _) = send(app, request("POST", "/post", Some("Bearer secret"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_rejects_missing_or_wrong_token() {
        let (app, _) = app(Some("secret"));
        let (status, body) = send(app.clone(), request("POST", "/post", None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "403 - Invalid bearer token");

        let (status, _) = send(app, request("POST", "/post", Some("Bearer nope"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_post_rejects_wrong_method() {
        let (app, _) = app(None);
        let (status, body) = send(app, request("GET", "/post", None)).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "405 - Method not allowed");
    }

    #[tokio::test]
    async fn test_token_check_precedes_method_check() {
        let (app, _) = app(Some("secret"));
        let (status, _) = send(app.clone(), request("PUT", "/post", None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(app, request("PUT", "/post", Some("Bearer secret"))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_blank_token_disables_auth() {
        let state = AppState::new(RelayMetrics::new().unwrap(), Some("  ".to_string()));
        assert!(state.bearer_token.is_none());
    }
}
