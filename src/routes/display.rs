//! Display view endpoint.
//!
//! GET /api/view?name=, ?lat=&lon= or ?geolocation=<failure> runs one search
//! in a fresh display session and returns what the page should show.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use super::AppState;
use crate::helpers::{non_empty, parse_lat_lon};
use crate::services::display::{
    render, CoordinateSource, Coordinates, DisplayView, GeolocationError, WeatherApp,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViewQuery {
    /// City search text
    pub name: Option<String>,
    /// Device latitude; takes precedence over `name` when given with `lon`
    pub lat: Option<String>,
    /// Device longitude
    pub lon: Option<String>,
    /// Client-side position failure: "unsupported" when the browser has no
    /// geolocation, anything else (e.g. "denied") when the fix failed
    pub geolocation: Option<String>,
}

impl ViewQuery {
    fn source(&self) -> CoordinateSource {
        if let Some(reason) = non_empty(self.geolocation.as_deref()) {
            let error = match reason.trim() {
                "unsupported" => GeolocationError::Unsupported,
                other => GeolocationError::Unavailable(other.to_string()),
            };
            return CoordinateSource::Device(Err(error));
        }

        let (lat, lon) = (self.lat.as_deref(), self.lon.as_deref());
        if non_empty(lat).is_none() && non_empty(lon).is_none() {
            return CoordinateSource::Query(self.name.clone().unwrap_or_default());
        }

        // Unusable device coordinates behave like a failed position fix.
        CoordinateSource::Device(
            parse_lat_lon(lat, lon)
                .map(|(latitude, longitude)| Coordinates {
                    latitude,
                    longitude,
                })
                .map_err(|e| GeolocationError::Unavailable(e.to_string())),
        )
    }
}

/// Run one search and render the resulting display state.
///
/// Always 200; failures come back as the `error` state with its message.
#[utoipa::path(
    get,
    path = "/api/view",
    tag = "Display",
    params(ViewQuery),
    responses(
        (status = 200, description = "Rendered display state", body = DisplayView),
    )
)]
pub async fn get_view(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Json<DisplayView> {
    let mut app = WeatherApp::new(state.geocoding.clone(), state.weather.clone());
    app.search(query.source()).await;
    Json(render(app.state()))
}
