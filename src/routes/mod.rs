pub mod cache;
pub mod display;
pub mod geocode;
pub mod health;
pub mod weather;

use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::path::PathBuf;
use utoipa::IntoParams;

use crate::services::asset_cache::SharedAssetCache;
use crate::services::geocoding::GeocodingClient;
use crate::services::open_meteo::OpenMeteoClient;
use crate::services::tomorrow::TomorrowClient;
use crate::services::weatherapi::WeatherApiClient;

/// Shared application state. Everything here is cheap to clone.
#[derive(Clone)]
pub(crate) struct AppState {
    /// Geocoder used by the display pipeline
    pub(crate) geocoding: GeocodingClient,
    /// Geocoder behind `/api/geocode` and `/api/reverse`
    pub(crate) proxy_geocoding: GeocodingClient,
    pub(crate) weather: OpenMeteoClient,
    pub(crate) bulk: WeatherApiClient,
    pub(crate) lightning: TomorrowClient,
    pub(crate) assets: SharedAssetCache,
    pub(crate) static_dir: PathBuf,
}

/// `lat`/`lon` query pair. Kept as strings so that missing and malformed
/// values can be told apart.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CoordinateQuery {
    /// Latitude in decimal degrees
    pub lat: Option<String>,
    /// Longitude in decimal degrees
    pub lon: Option<String>,
}

/// All API routes plus the static asset fallback.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/weather", get(weather::get_weather))
        .route("/api/weather/bulk", post(weather::post_bulk_weather))
        .route("/api/lightning", get(weather::get_lightning))
        .route("/api/geocode", get(geocode::get_geocode))
        .route("/api/reverse", get(geocode::get_reverse))
        .route("/api/view", get(display::get_view))
        .route("/api/cache/status", get(cache::get_cache_status))
        .fallback(cache::serve_asset)
        .with_state(state)
}
