//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /health
///
/// Probes the drink store and reports the result. Always answers 200 so an
/// orchestrator can read the body.
///
/// ## Example Response
///
/// ```json
/// {"status": "healthy", "store": "healthy"}
/// ```
#[instrument(skip_all, name = "drinks.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let response = match state.store.health_check().await {
        Ok(()) => HealthResponse {
            status: "healthy".to_string(),
            store: "healthy".to_string(),
        },
        Err(e) => {
            tracing::warn!(target: "drinks.health", error = %e, "Drink store health check failed");
            HealthResponse {
                status: "unhealthy".to_string(),
                store: "unhealthy".to_string(),
            }
        }
    };

    Json(response)
}
