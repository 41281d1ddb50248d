use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when the asset cache is active, "degraded" otherwise)
    pub status: String,
    /// API version
    pub version: String,
    /// Active asset cache generation, if any
    pub cache_generation: Option<String>,
}

/// Health check endpoint.
///
/// Returns the API status and version. A missing asset cache generation
/// reports "degraded" (still 200): the API works, offline assets do not.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache_generation = state.assets.read().await.active_tag().map(str::to_string);

    Json(HealthResponse {
        status: if cache_generation.is_some() {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_generation,
    })
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{get, send, state_for};
    use crate::services::asset_cache::install_and_activate;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_degraded_without_cache() {
        let state = state_for("http://127.0.0.1:9", std::env::temp_dir());
        let (status, body) = send(state, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["cache_generation"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_health_reports_active_generation() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("index.html"), "ok").unwrap();
        let state = state_for("http://127.0.0.1:9", root.path().to_path_buf());
        install_and_activate(&state.assets, "moti-v7", root.path(), &["/"])
            .await
            .unwrap();

        let (_, body) = send(state, get("/api/health")).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cache_generation"], "moti-v7");
    }
}
