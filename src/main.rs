// Moti API v0.1
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::AppState;
use services::asset_cache::{AssetCache, SharedAssetCache, PRECACHE_ASSETS};
use services::geocoding::GeocodingClient;
use services::open_meteo::OpenMeteoClient;
use services::tomorrow::TomorrowClient;
use services::weatherapi::WeatherApiClient;

/// Moti API OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Moti API",
        version = "0.1.0",
        description = "Weather proxy for the Moti front end. Normalizes Open-Meteo \
            forecasts into ISO-timestamped arrays, geocodes place names, forwards bulk \
            and lightning queries, renders the display state server-side and serves the \
            offline asset cache.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Forecasts, bulk conditions and lightning"),
        (name = "Geocoding", description = "Forward and reverse geocoding"),
        (name = "Display", description = "Server-side display state"),
        (name = "Cache", description = "Offline asset cache status"),
    ),
    paths(
        routes::health::health_check,
        routes::weather::get_weather,
        routes::weather::post_bulk_weather,
        routes::weather::get_lightning,
        routes::geocode::get_geocode,
        routes::geocode::get_reverse,
        routes::display::get_view,
        routes::cache::get_cache_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::weather::WeatherResponse,
            routes::weather::BulkWeatherRequest,
            routes::weather::LightningResponse,
            routes::geocode::GeocodeResponse,
            services::display::DisplayView,
            services::display::CurrentView,
            services::display::ForecastItem,
            services::display::Section,
            services::asset_cache::CacheStatus,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("Invalid configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "moti_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let http = services::http_client(&config.user_agent).expect("Failed to build HTTP client");

    // Install the offline asset cache; the API still runs without it.
    let assets: SharedAssetCache = Arc::new(RwLock::new(AssetCache::new()));
    match services::asset_cache::install_and_activate(
        &assets,
        &config.cache_tag,
        &config.static_dir,
        PRECACHE_ASSETS,
    )
    .await
    {
        Ok(evicted) => {
            tracing::info!(
                "Asset cache '{}' active ({} stale generations evicted)",
                config.cache_tag,
                evicted.len()
            );
        }
        Err(e) => {
            tracing::warn!(
                "Asset cache not installed from {}: {}",
                config.static_dir.display(),
                e
            );
        }
    }

    // Build shared application state
    let app_state = AppState {
        geocoding: GeocodingClient::new(
            http.clone(),
            &config.geocoding_url,
            &config.geocoding_language,
        ),
        proxy_geocoding: GeocodingClient::new(
            http.clone(),
            &config.geocoding_url,
            &config.proxy_geocoding_language,
        ),
        weather: OpenMeteoClient::new(http.clone(), &config.open_meteo_url),
        bulk: WeatherApiClient::new(
            http.clone(),
            &config.weatherapi_url,
            config.weatherapi_key.clone(),
        ),
        lightning: TomorrowClient::new(
            http,
            &config.tomorrow_url,
            config.tomorrow_api_key.clone(),
        ),
        assets,
        static_dir: config.static_dir.clone(),
    };

    if config.weatherapi_key.is_none() {
        tracing::warn!("WEATHERAPI_KEY not set; /api/weather/bulk will fail");
    }
    if config.tomorrow_api_key.is_none() {
        tracing::warn!("TOMORROW_API_KEY not set; /api/lightning will fail");
    }

    // CORS: any origin, GET for reads and POST for bulk queries
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let app = routes::router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
