use std::time::Duration;

use crate::boundary::AdminLevel;

/// Loader settings, read from the environment with the same defaults the
/// service has always shipped with. Call `dotenvy::dotenv()` before
/// `from_env` to pick up a local `.env` file.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Base URL of the bike network discovery API, including version prefix.
    pub city_bike_base: String,
    /// Base URL of the boundary metadata API.
    pub geo_boundaries_base: String,
    /// Administrative level to start boundary lookups at.
    pub admin_area_level: AdminLevel,
    /// Sentinel stored when no boundary feature contains a site.
    pub no_admin_area: String,
    pub site_chunk_size: usize,
    /// Per-request timeout during batch extraction.
    pub response_timeout: Duration,
    /// Dead-letter retry rounds after the first full pass.
    pub processing_retry_count: u32,
    /// Directory for cached boundary feature files.
    pub boundary_data_dir: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            city_bike_base: "https://api.citybik.es/v2".to_string(),
            geo_boundaries_base: "https://www.geoboundaries.org/gbRequest.html".to_string(),
            admin_area_level: AdminLevel::Adm3,
            no_admin_area: "NO-ADMIN".to_string(),
            site_chunk_size: 10,
            response_timeout: Duration::from_millis(500),
            processing_retry_count: 3,
            boundary_data_dir: "data".to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> LoaderConfig {
        let defaults = LoaderConfig::default();

        LoaderConfig {
            city_bike_base: env_or("APP_CITY_BIKE_URI", defaults.city_bike_base),
            geo_boundaries_base: env_or("APP_GEO_BOUNDARIES_URI", defaults.geo_boundaries_base),
            admin_area_level: std::env::var("APP_ADMIN_AREA_LEVEL")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.admin_area_level),
            no_admin_area: env_or("APP_NO_ADMIN_AREA", defaults.no_admin_area),
            site_chunk_size: parsed_env_or("APP_SITE_CHUNK_SIZE", defaults.site_chunk_size),
            response_timeout: std::env::var("APP_RESPONSE_TIMEOUT_SECONDS")
                .ok()
                .and_then(|raw| raw.parse::<f64>().ok())
                .map(Duration::from_secs_f64)
                .unwrap_or(defaults.response_timeout),
            processing_retry_count: parsed_env_or(
                "APP_PROCESSING_RETRY_COUNT",
                defaults.processing_retry_count,
            ),
            boundary_data_dir: env_or("APP_BOUNDARY_DATA_DIR", defaults.boundary_data_dir),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parsed_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
