//! Weather HTTP endpoints.
//!
//! - GET /api/weather?lat=&lon= (normalized Open-Meteo forecast)
//! - POST /api/weather/bulk (WeatherAPI bulk passthrough)
//! - GET /api/lightning?lat=&lon= (Tomorrow.io flash-rate density)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AppState, CoordinateQuery};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::parse_lat_lon;
use crate::services::normalizer::{
    normalize_current, normalize_series, NormalizedInstant, NormalizedSeries, CURRENT_LAYOUT,
    DAILY_LAYOUT, HOURLY_LAYOUT,
};
use crate::services::open_meteo::ForecastPayload;

/// Normalized forecast for one location.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherResponse {
    /// Latest sample; `null` when the provider sent none
    #[schema(value_type = Option<Object>)]
    pub current_weather: Option<NormalizedInstant>,
    /// Hourly series: `time` plus one array per variable
    #[schema(value_type = Object)]
    pub hourly: NormalizedSeries,
    /// Daily series: `time` plus one array per variable
    #[schema(value_type = Object)]
    pub daily: NormalizedSeries,
}

impl WeatherResponse {
    fn from_payload(payload: &ForecastPayload) -> Self {
        let offset = payload.utc_offset_seconds;
        let hourly = payload.hourly.as_ref().map(|c| c.to_block(&HOURLY_LAYOUT));
        let daily = payload.daily.as_ref().map(|c| c.to_block(&DAILY_LAYOUT));

        Self {
            current_weather: payload.current.as_ref().map(|sample| {
                normalize_current(&sample.to_sample(&CURRENT_LAYOUT), &CURRENT_LAYOUT, offset)
            }),
            hourly: normalize_series(hourly.as_ref(), &HOURLY_LAYOUT, offset),
            daily: normalize_series(daily.as_ref(), &DAILY_LAYOUT, offset),
        }
    }
}

/// Bulk request body, forwarded to WeatherAPI as-is.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkWeatherRequest {
    /// Location queries, e.g. `{"q": "Prishtina", "custom_id": "home"}`
    #[schema(value_type = Option<Vec<Object>>)]
    pub locations: Option<Vec<serde_json::Value>>,
}

/// Lightning activity at a location.
#[derive(Debug, Serialize, ToSchema)]
pub struct LightningResponse {
    pub lat: f64,
    pub lon: f64,
    /// Flashes per minute per km² in the latest interval
    pub flash_rate_density: f64,
    /// True when any flash activity is reported
    pub active: bool,
}

/// Get the normalized forecast for a coordinate pair.
///
/// Timestamps are ISO 8601 UTC, already shifted by the location's UTC offset.
#[utoipa::path(
    get,
    path = "/api/weather",
    tag = "Weather",
    params(CoordinateQuery),
    responses(
        (status = 200, description = "Normalized forecast", body = WeatherResponse),
        (status = 400, description = "lat/lon missing or not numeric", body = ErrorResponse),
        (status = 500, description = "Upstream failure", body = ErrorResponse),
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<WeatherResponse>, AppError> {
    let (lat, lon) = parse_lat_lon(query.lat.as_deref(), query.lon.as_deref())?;
    let payload = state.weather.fetch_forecast(lat, lon).await?;

    Ok(Json(WeatherResponse::from_payload(&payload)))
}

/// Bulk current conditions for several locations.
#[utoipa::path(
    post,
    path = "/api/weather/bulk",
    tag = "Weather",
    request_body = BulkWeatherRequest,
    responses(
        (status = 200, description = "Provider bulk payload", body = Object),
        (status = 400, description = "Body is not JSON or locations missing", body = ErrorResponse),
        (status = 500, description = "Upstream failure or no API key", body = ErrorResponse),
    )
)]
pub async fn post_bulk_weather(
    State(state): State<AppState>,
    body: Result<Json<BulkWeatherRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let locations = request
        .locations
        .ok_or_else(|| AppError::MissingParameter("locations required".to_string()))?;

    let payload = state.bulk.fetch_bulk(&locations).await?;
    Ok(Json(payload))
}

/// Current lightning flash-rate density for a coordinate pair.
#[utoipa::path(
    get,
    path = "/api/lightning",
    tag = "Weather",
    params(CoordinateQuery),
    responses(
        (status = 200, description = "Lightning activity", body = LightningResponse),
        (status = 400, description = "lat/lon missing or not numeric", body = ErrorResponse),
        (status = 500, description = "Upstream failure or no API key", body = ErrorResponse),
    )
)]
pub async fn get_lightning(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<LightningResponse>, AppError> {
    let (lat, lon) = parse_lat_lon(query.lat.as_deref(), query.lon.as_deref())?;
    let flash_rate_density = state.lightning.fetch_flash_rate(lat, lon).await?;

    Ok(Json(LightningResponse {
        lat,
        lon,
        flash_rate_density,
        active: flash_rate_density > 0.0,
    }))
}
