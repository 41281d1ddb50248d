use std::path::PathBuf;

use crate::services::asset_cache::DEFAULT_CACHE_TAG;

/// Default HTTP port, matching the front end's proxy expectations.
const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub open_meteo_url: String,
    pub geocoding_url: String,
    /// Language for geocoding done by the display pipeline (e.g. "en").
    pub geocoding_language: String,
    /// Language for `/api/geocode` and `/api/reverse` results (e.g. "sq").
    pub proxy_geocoding_language: String,
    pub weatherapi_url: String,
    /// WeatherAPI key for the bulk endpoint. Bulk requests fail when unset.
    pub weatherapi_key: Option<String>,
    pub tomorrow_url: String,
    /// Tomorrow.io key for the lightning endpoint.
    pub tomorrow_api_key: Option<String>,
    /// Directory holding the front end's static assets.
    pub static_dir: PathBuf,
    pub cache_tag: String,
    pub user_agent: String,
    /// Emit logs as JSON lines instead of the human-readable format.
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let log_json = match std::env::var("LOG_FORMAT") {
            Ok(raw) => match raw.to_lowercase().as_str() {
                "json" => true,
                "text" | "pretty" | "" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "LOG_FORMAT",
                        value: raw,
                    })
                }
            },
            Err(_) => false,
        };

        Ok(Self {
            port,
            open_meteo_url: env_or("OPEN_METEO_URL", "https://api.open-meteo.com/v1"),
            geocoding_url: env_or("GEOCODING_URL", "https://geocoding-api.open-meteo.com/v1"),
            geocoding_language: env_or("GEOCODING_LANGUAGE", "en"),
            proxy_geocoding_language: env_or("PROXY_GEOCODING_LANGUAGE", "sq"),
            weatherapi_url: env_or("WEATHERAPI_URL", "http://api.weatherapi.com/v1"),
            weatherapi_key: env_opt("WEATHERAPI_KEY"),
            tomorrow_url: env_or("TOMORROW_URL", "https://api.tomorrow.io/v4"),
            tomorrow_api_key: env_opt("TOMORROW_API_KEY"),
            static_dir: PathBuf::from(env_or("STATIC_DIR", "./public")),
            cache_tag: env_or("CACHE_TAG", DEFAULT_CACHE_TAG),
            user_agent: env_or(
                "USER_AGENT",
                concat!("Moti/", env!("CARGO_PKG_VERSION")),
            ),
            log_json,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read an optional variable, treating an empty value as unset.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
