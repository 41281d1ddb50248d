//! Asset cache HTTP surface.
//!
//! - GET /api/cache/status returns the installed generations.
//! - Every path no other route claims is served cache-first, then from disk.

use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use super::AppState;
use crate::services::asset_cache::CacheStatus;

/// Get the current asset cache status.
#[utoipa::path(
    get,
    path = "/api/cache/status",
    tag = "Cache",
    responses(
        (status = 200, description = "Current asset cache status", body = CacheStatus),
    )
)]
pub async fn get_cache_status(State(state): State<AppState>) -> Json<CacheStatus> {
    let cache = state.assets.read().await;
    Json(cache.status())
}

/// Fallback handler for static assets.
pub async fn serve_asset(State(state): State<AppState>, request: Request) -> Response {
    if matches!(*request.method(), Method::GET | Method::HEAD) {
        if let Some(asset) = state.assets.read().await.lookup(request.uri().path()) {
            return asset.into_response();
        }
    }

    tracing::debug!("Asset cache miss for {}", request.uri().path());
    match ServeDir::new(&state.static_dir).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
