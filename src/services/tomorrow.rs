//! Tomorrow.io lightning activity client.
//!
//! Reads the minute-resolution `lightningFlashRateDensity` timeline for the
//! next hour and reports the latest interval.

use serde::Deserialize;

use crate::errors::AppError;

const LIGHTNING_FIELD: &str = "lightningFlashRateDensity";

#[derive(Debug, Clone)]
pub struct TomorrowClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimelinesResponse {
    data: Option<TimelinesData>,
}

#[derive(Debug, Deserialize)]
struct TimelinesData {
    #[serde(default)]
    timelines: Vec<Timeline>,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    #[serde(default)]
    intervals: Vec<Interval>,
}

#[derive(Debug, Deserialize)]
struct Interval {
    values: Option<IntervalValues>,
}

#[derive(Debug, Deserialize)]
struct IntervalValues {
    #[serde(rename = "lightningFlashRateDensity")]
    lightning_flash_rate_density: Option<f64>,
}

/// Latest flash-rate density (flashes/min/km²) in a timelines payload,
/// `0.0` when the payload carries no intervals or no value.
fn latest_flash_rate(response: &TimelinesResponse) -> f64 {
    response
        .data
        .as_ref()
        .and_then(|d| d.timelines.first())
        .and_then(|t| t.intervals.last())
        .and_then(|i| i.values.as_ref())
        .and_then(|v| v.lightning_flash_rate_density)
        .unwrap_or(0.0)
}

impl TomorrowClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub async fn fetch_flash_rate(&self, lat: f64, lon: f64) -> Result<f64, AppError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::UpstreamError("TOMORROW_API_KEY is not configured".to_string())
        })?;

        let url = format!("{}/timelines", self.base_url);
        let location = format!("{},{}", lat, lon);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("fields", LIGHTNING_FIELD),
                ("timesteps", "1m"),
                ("startTime", "now"),
                ("endTime", "nowPlus1h"),
                ("apikey", api_key),
            ])
            .send()
            .await
            .map_err(|e| AppError::UpstreamError(format!("tomorrow.io request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamError(format!(
                "tomorrow.io returned HTTP {}",
                response.status()
            )));
        }

        let body: TimelinesResponse = response.json().await.map_err(|e| {
            AppError::UpstreamError(format!("tomorrow.io JSON parse error: {}", e))
        })?;

        Ok(latest_flash_rate(&body))
    }
}
