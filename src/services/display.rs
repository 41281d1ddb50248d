//! Display state controller.
//!
//! A session owns exactly one `DisplayState`. Every search runs through one
//! pipeline (`WeatherApp::search`) regardless of where its coordinates come
//! from, and the state is turned into what the user sees by a single
//! function (`render`). Sections are mutually exclusive by construction: the
//! visible set is derived from the state, never toggled piecemeal.
//!
//! Users only ever see the fixed messages below; upstream error detail goes
//! to the log.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::round_half_up;
use crate::services::geocoding::{GeocodingClient, Place};
use crate::services::open_meteo::{Conditions, DailyConditions, OpenMeteoClient};
use crate::services::weather_codes::{describe_weather_code, weather_icon_url};

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a city name";
pub const CITY_NOT_FOUND_MESSAGE: &str = "City not found. Please try again.";
pub const FETCH_FAILED_MESSAGE: &str = "Unable to fetch weather data. Please try again.";
pub const GEOLOCATION_UNSUPPORTED_MESSAGE: &str = "Geolocation is not supported by this browser";
pub const GEOLOCATION_DENIED_MESSAGE: &str =
    "Unable to access your location. Please enable location services.";

/// Days shown in the forecast strip, starting the day after today.
pub const FORECAST_DAYS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Why a device position could not be obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum GeolocationError {
    Unsupported,
    Unavailable(String),
}

/// How a search obtains its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateSource {
    /// Free-text place name, geocoded strictly.
    Query(String),
    /// Device position, named on a best-effort basis.
    Device(Result<Coordinates, GeolocationError>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub place: Place,
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub weather_code: i32,
    pub visibility_meters: Option<f64>,
    /// Today's date at the location ("2024-03-01"), from the first daily entry
    pub local_date: Option<String>,
}

impl WeatherSnapshot {
    fn from_conditions(place: Place, conditions: &Conditions) -> Self {
        let current = &conditions.current;
        Self {
            place,
            temperature: current.temperature_2m,
            apparent_temperature: current.apparent_temperature,
            humidity: current.relative_humidity_2m,
            wind_speed: current.wind_speed_10m,
            weather_code: current.weather_code,
            // First hourly sample stands in for "now".
            visibility_meters: conditions.hourly.visibility.first().copied().flatten(),
            local_date: conditions.daily.time.first().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDay {
    pub date: String,
    pub weather_code: i32,
    pub temperature_max: f64,
    pub temperature_min: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState {
    Idle,
    Loading,
    Error(String),
    Ready(Box<WeatherSnapshot>, Vec<ForecastDay>),
}

/// A page section that can be shown or hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Loading,
    Error,
    CurrentWeather,
    Forecast,
}

impl DisplayState {
    /// Sections visible in this state; everything else is hidden.
    pub fn visible_sections(&self) -> &'static [Section] {
        match self {
            DisplayState::Idle => &[],
            DisplayState::Loading => &[Section::Loading],
            DisplayState::Error(_) => &[Section::Error],
            DisplayState::Ready(..) => &[Section::CurrentWeather, Section::Forecast],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DisplayState::Idle => "idle",
            DisplayState::Loading => "loading",
            DisplayState::Error(_) => "error",
            DisplayState::Ready(..) => "ready",
        }
    }
}

/// Read the forecast strip from the daily columns: skip today, take up to
/// `FORECAST_DAYS`, and stop early at the first incomplete day.
pub fn forecast_days(daily: &DailyConditions) -> Vec<ForecastDay> {
    (1..=FORECAST_DAYS)
        .map_while(|i| {
            Some(ForecastDay {
                date: daily.time.get(i)?.clone(),
                weather_code: (*daily.weather_code.get(i)?)?,
                temperature_max: (*daily.temperature_2m_max.get(i)?)?,
                temperature_min: (*daily.temperature_2m_min.get(i)?)?,
            })
        })
        .collect()
}

/// One display session. Starts `Idle`; there is no terminal state.
pub struct WeatherApp {
    geocoding: GeocodingClient,
    weather: OpenMeteoClient,
    state: DisplayState,
}

impl WeatherApp {
    pub fn new(geocoding: GeocodingClient, weather: OpenMeteoClient) -> Self {
        Self {
            geocoding,
            weather,
            state: DisplayState::Idle,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Run one search to completion and return the resulting state.
    pub async fn search(&mut self, source: CoordinateSource) -> &DisplayState {
        let place = match source {
            CoordinateSource::Query(query) => {
                let query = query.trim();
                if query.is_empty() {
                    return self.fail(EMPTY_QUERY_MESSAGE);
                }
                self.transition(DisplayState::Loading);
                match self.geocoding.resolve_by_name(query).await {
                    Ok(place) => place,
                    Err(e) => {
                        tracing::error!("Search error for '{}': {}", query, e);
                        return self.fail(CITY_NOT_FOUND_MESSAGE);
                    }
                }
            }
            CoordinateSource::Device(Err(GeolocationError::Unsupported)) => {
                return self.fail(GEOLOCATION_UNSUPPORTED_MESSAGE);
            }
            CoordinateSource::Device(Err(GeolocationError::Unavailable(reason))) => {
                self.transition(DisplayState::Loading);
                tracing::error!("Geolocation error: {}", reason);
                return self.fail(GEOLOCATION_DENIED_MESSAGE);
            }
            CoordinateSource::Device(Ok(coords)) => {
                self.transition(DisplayState::Loading);
                self.geocoding
                    .resolve_by_coordinates(coords.latitude, coords.longitude)
                    .await
            }
        };

        match self
            .weather
            .fetch_conditions(place.latitude, place.longitude)
            .await
        {
            Ok(conditions) => {
                let forecast = forecast_days(&conditions.daily);
                let snapshot = WeatherSnapshot::from_conditions(place, &conditions);
                self.transition(DisplayState::Ready(Box::new(snapshot), forecast));
            }
            Err(e) => {
                tracing::error!("Weather fetch error for {}: {}", place.label, e);
                self.fail(FETCH_FAILED_MESSAGE);
            }
        }

        &self.state
    }

    fn fail(&mut self, message: &str) -> &DisplayState {
        self.transition(DisplayState::Error(message.to_string()));
        &self.state
    }

    fn transition(&mut self, next: DisplayState) {
        tracing::debug!("Display state {} -> {}", self.state.name(), next.name());
        self.state = next;
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Everything a client needs to paint the page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DisplayView {
    /// "idle", "loading", "error" or "ready"
    pub state: String,
    /// Sections to show; all others are hidden
    pub visible: Vec<Section>,
    /// Error text when `state` is "error"
    pub error_text: Option<String>,
    pub current: Option<CurrentView>,
    pub forecast: Vec<ForecastItem>,
}

/// Current-conditions card.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CurrentView {
    pub city: String,
    /// e.g. "Friday, March 1, 2024"
    pub date: String,
    /// e.g. "8°"
    pub temperature: String,
    pub condition: String,
    pub icon_url: String,
    pub feels_like: String,
    /// e.g. "13 km/h"
    pub wind_speed: String,
    /// e.g. "71%"
    pub humidity: String,
    /// e.g. "24 km", or "N/A" when unknown
    pub visibility: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ForecastItem {
    /// Short weekday, e.g. "Sat"
    pub day: String,
    pub icon_url: String,
    pub condition: String,
    pub high: String,
    pub low: String,
}

pub fn render(state: &DisplayState) -> DisplayView {
    let (error_text, current, forecast) = match state {
        DisplayState::Idle | DisplayState::Loading => (None, None, Vec::new()),
        DisplayState::Error(message) => (Some(message.clone()), None, Vec::new()),
        DisplayState::Ready(snapshot, days) => (
            None,
            Some(render_current(snapshot)),
            days.iter().map(render_forecast_day).collect(),
        ),
    };

    DisplayView {
        state: state.name().to_string(),
        visible: state.visible_sections().to_vec(),
        error_text,
        current,
        forecast,
    }
}

fn degrees(v: f64) -> String {
    format!("{}°", round_half_up(v))
}

fn render_current(snapshot: &WeatherSnapshot) -> CurrentView {
    let visibility = match snapshot.visibility_meters {
        Some(m) if m > 0.0 && m.is_finite() => format!("{} km", round_half_up(m / 1000.0)),
        _ => "N/A".to_string(),
    };

    CurrentView {
        city: snapshot.place.label.clone(),
        date: long_date(snapshot.local_date.as_deref()),
        temperature: degrees(snapshot.temperature),
        condition: describe_weather_code(snapshot.weather_code).to_string(),
        icon_url: weather_icon_url(snapshot.weather_code),
        feels_like: degrees(snapshot.apparent_temperature),
        wind_speed: format!("{} km/h", round_half_up(snapshot.wind_speed)),
        humidity: format!("{}%", snapshot.humidity),
        visibility,
    }
}

/// Long date for the current card; today in UTC when the provider sent none.
fn long_date(date: Option<&str>) -> String {
    date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive())
        .format("%A, %B %-d, %Y")
        .to_string()
}

fn render_forecast_day(day: &ForecastDay) -> ForecastItem {
    let weekday = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
        .map(|d| d.format("%a").to_string())
        .unwrap_or_else(|_| day.date.clone());

    ForecastItem {
        day: weekday,
        icon_url: weather_icon_url(day.weather_code),
        condition: describe_weather_code(day.weather_code).to_string(),
        high: degrees(day.temperature_max),
        low: degrees(day.temperature_min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn daily(days: usize) -> DailyConditions {
        DailyConditions {
            time: (0..days).map(|d| format!("2024-03-{:02}", d + 1)).collect(),
            weather_code: (0..days).map(|d| Some(if d % 2 == 0 { 61 } else { 0 })).collect(),
            temperature_2m_max: (0..days).map(|d| Some(10.0 + d as f64)).collect(),
            temperature_2m_min: (0..days).map(|d| Some(d as f64 - 2.0)).collect(),
        }
    }

    fn conditions_json() -> serde_json::Value {
        serde_json::json!({
            "current": {
                "temperature_2m": 8.4,
                "relative_humidity_2m": 71,
                "apparent_temperature": 6.5,
                "precipitation": 0.0,
                "weather_code": 2,
                "wind_speed_10m": 12.7,
                "wind_direction_10m": 240
            },
            "hourly": { "visibility": [24140.0] },
            "daily": {
                "time": ["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-04"],
                "weather_code": [2, 61, 3, 95],
                "temperature_2m_max": [10.1, 7.9, 9.5, 12.0],
                "temperature_2m_min": [1.2, 0.4, -2.5, 3.0]
            }
        })
    }

    async fn app_with(geo: &MockServer, weather: &MockServer) -> WeatherApp {
        let http = reqwest::Client::new();
        WeatherApp::new(
            GeocodingClient::new(http.clone(), &geo.uri(), "en"),
            OpenMeteoClient::new(http, &weather.uri()),
        )
    }

    async fn mount_geocode(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_forecast(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[test]
    fn test_visible_sections_are_exclusive() {
        assert!(DisplayState::Idle.visible_sections().is_empty());
        assert_eq!(DisplayState::Loading.visible_sections(), &[Section::Loading]);
        assert_eq!(
            DisplayState::Error("x".into()).visible_sections(),
            &[Section::Error]
        );
    }

    #[test]
    fn test_forecast_skips_today_and_takes_five() {
        let days = forecast_days(&daily(8));
        assert_eq!(days.len(), FORECAST_DAYS);
        assert_eq!(days[0].date, "2024-03-02");
        assert_eq!(days[4].date, "2024-03-06");
    }

    #[test]
    fn test_forecast_with_short_arrays() {
        // Today plus three more days.
        let days = forecast_days(&daily(4));
        assert_eq!(days.len(), 3);
        assert!(forecast_days(&daily(1)).is_empty());
        assert!(forecast_days(&DailyConditions::default()).is_empty());
    }

    #[test]
    fn test_forecast_stops_at_incomplete_day() {
        let mut d = daily(6);
        d.temperature_2m_min[3] = None;
        assert_eq!(forecast_days(&d).len(), 2);
    }

    #[test]
    fn test_render_ready() {
        let snapshot = WeatherSnapshot {
            place: Place {
                label: "Prishtina, Kosovo".into(),
                latitude: 42.67,
                longitude: 21.17,
            },
            temperature: 8.4,
            apparent_temperature: -2.5,
            humidity: 71.0,
            wind_speed: 12.7,
            weather_code: 2,
            visibility_meters: Some(24_140.0),
            local_date: Some("2024-03-01".into()),
        };
        let state = DisplayState::Ready(Box::new(snapshot), forecast_days(&daily(3)));
        let view = render(&state);

        assert_eq!(view.state, "ready");
        assert_eq!(view.visible, vec![Section::CurrentWeather, Section::Forecast]);
        assert!(view.error_text.is_none());

        let current = view.current.unwrap();
        assert_eq!(current.city, "Prishtina, Kosovo");
        assert_eq!(current.date, "Friday, March 1, 2024");
        assert_eq!(current.temperature, "8°");
        assert_eq!(current.feels_like, "-2°");
        assert_eq!(current.wind_speed, "13 km/h");
        assert_eq!(current.humidity, "71%");
        assert_eq!(current.visibility, "24 km");
        assert_eq!(current.condition, "Partly cloudy");
        assert_eq!(current.icon_url, "https://openweathermap.org/img/w/03d.png");

        assert_eq!(view.forecast.len(), 2);
        // 2024-03-02 was a Saturday.
        assert_eq!(view.forecast[0].day, "Sat");
        assert_eq!(view.forecast[0].condition, "Clear sky");
        assert_eq!(view.forecast[0].high, "11°");
        assert_eq!(view.forecast[0].low, "-1°");
    }

    #[test]
    fn test_render_missing_visibility() {
        let snapshot = WeatherSnapshot {
            place: Place {
                label: "X".into(),
                latitude: 0.0,
                longitude: 0.0,
            },
            temperature: 0.0,
            apparent_temperature: 0.0,
            humidity: 50.0,
            wind_speed: 0.0,
            weather_code: 12,
            visibility_meters: None,
            local_date: None,
        };
        let view = render(&DisplayState::Ready(Box::new(snapshot), Vec::new()));
        let current = view.current.unwrap();
        assert_eq!(current.visibility, "N/A");
        assert_eq!(current.condition, "Unknown");
        let today = Utc::now().date_naive();
        let expected = [today, today.pred_opt().unwrap(), today.succ_opt().unwrap()]
            .map(|d| d.format("%A, %B %-d, %Y").to_string());
        assert!(expected.contains(&current.date), "{}", current.date);
    }

    #[tokio::test]
    async fn test_search_success_shows_weather_and_forecast() {
        let geo = MockServer::start().await;
        let weather = MockServer::start().await;
        mount_geocode(
            &geo,
            serde_json::json!({
                "results": [{ "name": "Prishtina", "latitude": 42.67, "longitude": 21.17, "country": "Kosovo" }]
            }),
        )
        .await;
        mount_forecast(&weather, ResponseTemplate::new(200).set_body_json(conditions_json())).await;

        let mut app = app_with(&geo, &weather).await;
        assert_eq!(app.state(), &DisplayState::Idle);

        let state = app.search(CoordinateSource::Query("  Prishtina ".into())).await;
        assert_eq!(
            state.visible_sections(),
            &[Section::CurrentWeather, Section::Forecast]
        );
        match state {
            DisplayState::Ready(snapshot, days) => {
                assert_eq!(snapshot.place.label, "Prishtina, Kosovo");
                assert_eq!(snapshot.visibility_meters, Some(24_140.0));
                assert_eq!(snapshot.local_date.as_deref(), Some("2024-03-01"));
                assert_eq!(days.len(), 3);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_city_not_found_shows_only_error() {
        let geo = MockServer::start().await;
        let weather = MockServer::start().await;
        mount_geocode(&geo, serde_json::json!({ "results": [] })).await;

        let mut app = app_with(&geo, &weather).await;
        let state = app.search(CoordinateSource::Query("Nowhere".into())).await;

        assert_eq!(state, &DisplayState::Error(CITY_NOT_FOUND_MESSAGE.into()));
        assert_eq!(state.visible_sections(), &[Section::Error]);
    }

    #[tokio::test]
    async fn test_search_fetch_failure_hides_previous_weather() {
        let geo = MockServer::start().await;
        let weather = MockServer::start().await;
        mount_geocode(
            &geo,
            serde_json::json!({ "results": [{ "name": "Viti", "latitude": 42.3, "longitude": 21.4 }] }),
        )
        .await;
        // First call succeeds, later ones fail.
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(conditions_json()))
            .up_to_n_times(1)
            .mount(&weather)
            .await;
        mount_forecast(&weather, ResponseTemplate::new(500).set_body_string("boom")).await;

        let mut app = app_with(&geo, &weather).await;
        assert_eq!(app.search(CoordinateSource::Query("Viti".into())).await.name(), "ready");

        let state = app.search(CoordinateSource::Query("Viti".into())).await;
        assert_eq!(state, &DisplayState::Error(FETCH_FAILED_MESSAGE.into()));
        let view = render(state);
        assert_eq!(view.visible, vec![Section::Error]);
        assert!(view.current.is_none());
        assert!(view.forecast.is_empty());
        assert!(!view.error_text.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected_without_requests() {
        let geo = MockServer::start().await;
        let weather = MockServer::start().await;

        let mut app = app_with(&geo, &weather).await;
        let state = app.search(CoordinateSource::Query("   ".into())).await;

        assert_eq!(state, &DisplayState::Error(EMPTY_QUERY_MESSAGE.into()));
        assert!(geo.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_device_search_uses_fallback_label() {
        let geo = MockServer::start().await;
        let weather = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&geo)
            .await;
        mount_forecast(&weather, ResponseTemplate::new(200).set_body_json(conditions_json())).await;

        let mut app = app_with(&geo, &weather).await;
        let state = app
            .search(CoordinateSource::Device(Ok(Coordinates {
                latitude: 42.32,
                longitude: 21.36,
            })))
            .await;

        match state {
            DisplayState::Ready(snapshot, _) => {
                assert_eq!(snapshot.place.label, "Current Location");
                assert_eq!(snapshot.place.latitude, 42.32);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_device_errors_map_to_fixed_messages() {
        let geo = MockServer::start().await;
        let weather = MockServer::start().await;
        let mut app = app_with(&geo, &weather).await;

        let state = app
            .search(CoordinateSource::Device(Err(GeolocationError::Unsupported)))
            .await;
        assert_eq!(
            state,
            &DisplayState::Error(GEOLOCATION_UNSUPPORTED_MESSAGE.into())
        );

        let state = app
            .search(CoordinateSource::Device(Err(GeolocationError::Unavailable(
                "permission denied".into(),
            ))))
            .await;
        assert_eq!(state, &DisplayState::Error(GEOLOCATION_DENIED_MESSAGE.into()));
    }
}
