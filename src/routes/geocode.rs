//! Geocoding HTTP endpoints.
//!
//! - GET /api/geocode?name= (best match for a place name)
//! - GET /api/reverse?lat=&lon= (raw reverse-geocode payload)

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{AppState, CoordinateQuery};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{non_empty, parse_lat_lon};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GeocodeQuery {
    /// Free-text place name, e.g. "Prishtina"
    pub name: Option<String>,
}

/// Best geocoding match.
#[derive(Debug, Serialize, ToSchema)]
pub struct GeocodeResponse {
    pub lat: f64,
    pub lon: f64,
    /// "Name, Country"
    pub label: String,
}

#[utoipa::path(
    get,
    path = "/api/geocode",
    tag = "Geocoding",
    params(GeocodeQuery),
    responses(
        (status = 200, description = "Best match", body = GeocodeResponse),
        (status = 400, description = "name missing", body = ErrorResponse),
        (status = 404, description = "No match", body = ErrorResponse),
        (status = 500, description = "Upstream failure", body = ErrorResponse),
    )
)]
pub async fn get_geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeocodeResponse>, AppError> {
    let name = non_empty(query.name.as_deref())
        .ok_or_else(|| AppError::MissingParameter("name required".to_string()))?;

    let place = state.proxy_geocoding.resolve_by_name(name.trim()).await?;
    Ok(Json(GeocodeResponse {
        lat: place.latitude,
        lon: place.longitude,
        label: place.label,
    }))
}

/// Reverse geocode a coordinate pair. The provider payload is returned as-is.
#[utoipa::path(
    get,
    path = "/api/reverse",
    tag = "Geocoding",
    params(CoordinateQuery),
    responses(
        (status = 200, description = "Provider payload", body = Object),
        (status = 400, description = "lat/lon missing or not numeric", body = ErrorResponse),
        (status = 500, description = "Upstream failure", body = ErrorResponse),
    )
)]
pub async fn get_reverse(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (lat, lon) = parse_lat_lon(query.lat.as_deref(), query.lon.as_deref())?;
    Ok(Json(state.proxy_geocoding.reverse_raw(lat, lon).await?))
}
