//! HTTP routes for the drinks service.
//!
//! Defines the Axum router and application state.

use crate::auth::JwtValidator;
use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::repositories::DrinkStore;
use axum::{
    http::{header, Method},
    middleware,
    routing::{get, patch},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Drink catalog storage.
    pub store: Arc<dyn DrinkStore>,

    /// Service configuration.
    pub config: Config,

    /// Bearer token validator, backed by the cached signing keys.
    pub jwt_validator: Arc<JwtValidator>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `GET /drinks` - Short projection, public
/// - `GET /drinks-detail` - Long projection, `get:drinks-detail`
/// - `POST /drinks` - Create, `post:drinks`
/// - `PATCH /drinks/:id` - Update, `patch:drinks`
/// - `DELETE /drinks/:id` - Delete, `delete:drinks`
/// - `/health` - Store health probe, public
/// - `/metrics` - Prometheus metrics endpoint, public
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - Permissive CORS
/// - HTTP metrics middleware
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    // Protected handlers take `AuthClaims`, so public and protected methods
    // can share a path.
    let app_routes = Router::new()
        .route(
            "/drinks",
            get(handlers::list_drinks).post(handlers::create_drink),
        )
        .route("/drinks-detail", get(handlers::list_drinks_detail))
        .route(
            "/drinks/:id",
            patch(handlers::update_drink).delete(handlers::delete_drink),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflights, decorate responses
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(http_metrics_middleware))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{JwksClient, ValidationPolicy};
    use crate::repositories::InMemoryDrinkStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = Config::from_vars(&HashMap::from([
            ("AUTH_DOMAIN".to_string(), "coffee.example.com".to_string()),
            ("API_AUDIENCE".to_string(), "drinks".to_string()),
        ]))
        .unwrap();

        let jwt_validator = Arc::new(JwtValidator::new(
            Arc::new(JwksClient::from_keys(Vec::new())),
            ValidationPolicy::from_config(&config),
        ));

        let state = Arc::new(AppState {
            store: Arc::new(InMemoryDrinkStore::new()),
            config,
            jwt_validator,
        });

        build_routes(state, PrometheusBuilder::new().build_recorder().handle())
    }

    async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, headers, body)
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_public_list_needs_no_token() {
        let (status, _, body) = send(
            Request::builder()
                .uri("/drinks")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["drinks"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_post_on_shared_path_requires_token() {
        let (status, headers, body) = send(
            Request::builder()
                .method("POST")
                .uri("/drinks")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"title":"Water","recipe":[]}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(headers.contains_key("www-authenticate"));
        assert_eq!(body["code"], "authorization_header_missing");
    }

    #[tokio::test]
    async fn test_non_integer_id_is_not_found() {
        let (status, _, body) = send(
            Request::builder()
                .method("DELETE")
                .uri("/drinks/latte")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], 404);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (status, headers, _) = send(
            Request::builder()
                .method("OPTIONS")
                .uri("/drinks")
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "PATCH")
                .header("access-control-request-headers", "authorization,content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
        let methods = headers
            .get("access-control-allow-methods")
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(methods.contains("PATCH"));
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn test_health_reports_store() {
        let (status, _, body) = send(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["store"], "healthy");
    }
}
