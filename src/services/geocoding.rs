//! Open-Meteo geocoding client.
//!
//! Forward lookups (`resolve_by_name`) are strict: an empty result set is a
//! `NotFound`. Coordinate lookups (`resolve_by_coordinates`) only decorate a
//! device position with a name, so they never fail.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Label used when a coordinate lookup yields nothing usable.
pub const FALLBACK_PLACE_LABEL: &str = "Current Location";

/// A resolved place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    /// Display name, e.g. "Prishtina, Kosovo"
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Client for the Open-Meteo geocoding API.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: reqwest::Client,
    base_url: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: Option<String>,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

impl GeocodingResult {
    /// `name`, suffixed with `", " + country` when a country is known.
    fn label(&self) -> Option<String> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        Some(match self.country.as_deref().filter(|c| !c.is_empty()) {
            Some(country) => format!("{}, {}", name, country),
            None => name.to_string(),
        })
    }
}

impl GeocodingClient {
    pub fn new(client: reqwest::Client, base_url: &str, language: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        }
    }

    /// Resolve a free-text place name to the best-ranked match.
    pub async fn resolve_by_name(&self, query: &str) -> Result<Place, AppError> {
        let body = self
            .get_json(
                "search",
                &[
                    ("name", query.to_string()),
                    ("count", "1".to_string()),
                    ("language", self.language.clone()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        let response: GeocodingResponse = serde_json::from_value(body).map_err(|e| {
            AppError::UpstreamError(format!("geocoding response structure error: {}", e))
        })?;

        let first = response
            .results
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| AppError::NotFound("City not found".to_string()))?;

        let label = first.label().unwrap_or_else(|| query.to_string());
        tracing::debug!(
            "Geocoded '{}' to {} ({}, {})",
            query,
            label,
            first.latitude,
            first.longitude
        );

        Ok(Place {
            label,
            latitude: first.latitude,
            longitude: first.longitude,
        })
    }

    /// Name a device position. Falls back to `FALLBACK_PLACE_LABEL` on any
    /// failure; the given coordinates are always kept.
    pub async fn resolve_by_coordinates(&self, lat: f64, lon: f64) -> Place {
        let label = match self.reverse_raw(lat, lon).await {
            Ok(body) => serde_json::from_value::<GeocodingResponse>(body)
                .ok()
                .and_then(|r| r.results)
                .and_then(|r| r.into_iter().next())
                .and_then(|first| first.label()),
            Err(e) => {
                tracing::warn!("Reverse geocoding error: {}", e);
                None
            }
        };

        Place {
            label: label.unwrap_or_else(|| FALLBACK_PLACE_LABEL.to_string()),
            latitude: lat,
            longitude: lon,
        }
    }

    /// Raw reverse-geocode payload, passed through by `/api/reverse`.
    pub async fn reverse_raw(&self, lat: f64, lon: f64) -> Result<serde_json::Value, AppError> {
        self.get_json(
            "reverse",
            &[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("language", self.language.clone()),
                ("format", "json".to_string()),
            ],
        )
        .await
    }

    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::UpstreamError(format!("geocoding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamError(format!(
                "geocoding {} returned HTTP {}",
                endpoint,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::UpstreamError(format!("geocoding JSON parse error: {}", e)))
    }
}
