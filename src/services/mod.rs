pub mod asset_cache;
pub mod display;
pub mod geocoding;
pub mod normalizer;
pub mod open_meteo;
pub mod tomorrow;
pub mod weather_codes;
pub mod weatherapi;

use crate::errors::AppError;

/// Build the outbound HTTP client shared by every upstream client.
///
/// No timeout is set; requests rely on transport defaults.
pub fn http_client(user_agent: &str) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))
}
