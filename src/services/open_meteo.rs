//! Open-Meteo forecast client.
//!
//! Two request shapes are supported:
//! - `fetch_conditions`: the display variable set in Open-Meteo's default
//!   ISO-8601 time format, consumed by the display controller.
//! - `fetch_forecast`: the proxy variable set with `timeformat=unixtime`,
//!   decoded into `TimeSeriesBlock`s for the normalizer.
//!
//! See: https://open-meteo.com/en/docs

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::services::normalizer::{
    InstantSample, SeriesLayout, TimeSeriesBlock, CURRENT_LAYOUT, DAILY_LAYOUT, HOURLY_LAYOUT,
};

/// Current variables requested for the display view.
const CONDITIONS_CURRENT: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
precipitation,weather_code,wind_speed_10m,wind_direction_10m";
const CONDITIONS_HOURLY: &str = "visibility";
const CONDITIONS_DAILY: &str = "weather_code,temperature_2m_max,temperature_2m_min";

/// Client for the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
}

// --- Display conditions (ISO time format) ---

/// Raw provider payload for the display view.
#[derive(Debug, Clone, Deserialize)]
pub struct Conditions {
    pub current: CurrentConditions,
    #[serde(default)]
    pub hourly: HourlyConditions,
    #[serde(default)]
    pub daily: DailyConditions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentConditions {
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub apparent_temperature: f64,
    #[serde(default)]
    pub precipitation: Option<f64>,
    pub weather_code: i32,
    pub wind_speed_10m: f64,
    #[serde(default)]
    pub wind_direction_10m: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlyConditions {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub visibility: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyConditions {
    /// Local dates, e.g. "2024-03-01".
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub weather_code: Vec<Option<i32>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
}

// --- Proxy forecast (unixtime format) ---

/// Provider payload for the proxy, with unix-second timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastPayload {
    #[serde(default)]
    pub utc_offset_seconds: i32,
    pub current: Option<RawSample>,
    pub hourly: Option<RawColumns>,
    pub daily: Option<RawColumns>,
}

/// One provider section in columnar form: a `time` column plus one column
/// per requested variable, keyed by provider name.
#[derive(Debug, Clone, Deserialize)]
pub struct RawColumns {
    #[serde(default)]
    pub time: Vec<i64>,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSample {
    pub time: i64,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

impl RawColumns {
    /// Re-encode as a compact block laid out by `layout`.
    ///
    /// The block starts at the first timestamp and spans one nominal interval
    /// per sample. Columns that are missing, not arrays, or contain
    /// non-numeric entries become `None`; `null` samples become NaN.
    /// A range that overflows yields a backwards block, which normalizes to
    /// an empty series.
    pub fn to_block(&self, layout: &SeriesLayout) -> TimeSeriesBlock {
        let base_time = self.time.first().copied().unwrap_or(0);
        let end_time = i64::try_from(self.time.len())
            .ok()
            .and_then(|n| i64::from(layout.interval_seconds).checked_mul(n))
            .and_then(|span| base_time.checked_add(span))
            .unwrap_or(i64::MIN);

        TimeSeriesBlock {
            base_time,
            end_time,
            interval_seconds: layout.interval_seconds,
            variables: layout
                .slots
                .iter()
                .map(|slot| self.columns.get(slot.source).and_then(numeric_column))
                .collect(),
        }
    }
}

impl RawSample {
    pub fn to_sample(&self, layout: &SeriesLayout) -> InstantSample {
        InstantSample {
            time: self.time,
            variables: layout
                .slots
                .iter()
                .map(|slot| self.columns.get(slot.source).and_then(Value::as_f64))
                .collect(),
        }
    }
}

fn numeric_column(value: &Value) -> Option<Vec<f64>> {
    value
        .as_array()?
        .iter()
        .map(|v| match v {
            Value::Null => Some(f64::NAN),
            other => other.as_f64(),
        })
        .collect()
}

impl OpenMeteoClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch current/hourly/daily conditions for the display view.
    pub async fn fetch_conditions(&self, lat: f64, lon: f64) -> Result<Conditions, AppError> {
        let query = [
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("current", CONDITIONS_CURRENT.to_string()),
            ("hourly", CONDITIONS_HOURLY.to_string()),
            ("daily", CONDITIONS_DAILY.to_string()),
            ("timezone", "auto".to_string()),
        ];
        let body = self.get_forecast(&query).await?;

        serde_json::from_value(body).map_err(|e| {
            AppError::UpstreamError(format!("open-meteo conditions structure error: {}", e))
        })
    }

    /// Fetch the proxy's variable set as unix-time columns.
    ///
    /// The variable lists come from the normalizer's layout tables.
    pub async fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<ForecastPayload, AppError> {
        let query = [
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("current", CURRENT_LAYOUT.request_list()),
            ("hourly", HOURLY_LAYOUT.request_list()),
            ("daily", DAILY_LAYOUT.request_list()),
            ("timezone", "auto".to_string()),
            ("timeformat", "unixtime".to_string()),
        ];
        let body = self.get_forecast(&query).await?;

        serde_json::from_value(body).map_err(|e| {
            AppError::UpstreamError(format!("open-meteo forecast structure error: {}", e))
        })
    }

    async fn get_forecast(&self, query: &[(&str, String)]) -> Result<Value, AppError> {
        let url = format!("{}/forecast", self.base_url);
        tracing::debug!("Requesting {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::UpstreamError(format!("open-meteo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamError(format!(
                "open-meteo returned HTTP {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            AppError::UpstreamError(format!("open-meteo JSON parse error: {}", e))
        })
    }
}
