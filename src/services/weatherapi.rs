//! WeatherAPI bulk current-conditions client.
//!
//! See: https://www.weatherapi.com/docs/#intro-bulk

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherApiClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Forward a bulk query and return the provider payload unchanged.
    pub async fn fetch_bulk(
        &self,
        locations: &[serde_json::Value],
    ) -> Result<serde_json::Value, AppError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::UpstreamError("WEATHERAPI_KEY is not configured".to_string())
        })?;

        let url = format!("{}/current.json", self.base_url);
        tracing::debug!("Bulk weather request for {} locations", locations.len());

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key), ("q", "bulk")])
            .json(&serde_json::json!({ "locations": locations }))
            .send()
            .await
            .map_err(|e| AppError::UpstreamError(format!("weatherapi request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamError(format!(
                "weatherapi returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::UpstreamError(format!("weatherapi JSON parse error: {}", e)))
    }
}
