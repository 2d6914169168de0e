use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use cached::{Cached, SizedCache};
use serde_derive::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::resource_name;

/// Countries whose boundary URL we remember between batches.
const URL_CACHE_SIZE: usize = 64;
/// Parsed feature collections held in memory. These are large, so the
/// bound is deliberately small; evicted entries fall back to the file copy.
const FEATURE_CACHE_SIZE: usize = 8;

/// GeoBoundaries administrative levels, most granular first. Only used as
/// a downgrade path while probing for available data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminLevel {
    Adm3,
    Adm2,
    Adm1,
    Adm0,
}

impl AdminLevel {
    /// Next coarser level, or `None` past ADM0.
    pub fn downgrade(self) -> Option<AdminLevel> {
        match self {
            AdminLevel::Adm3 => Some(AdminLevel::Adm2),
            AdminLevel::Adm2 => Some(AdminLevel::Adm1),
            AdminLevel::Adm1 => Some(AdminLevel::Adm0),
            AdminLevel::Adm0 => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdminLevel::Adm3 => "ADM3",
            AdminLevel::Adm2 => "ADM2",
            AdminLevel::Adm1 => "ADM1",
            AdminLevel::Adm0 => "ADM0",
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("unrecognised admin level: {0}")]
pub struct UnknownAdminLevel(String);

impl FromStr for AdminLevel {
    type Err = UnknownAdminLevel;

    fn from_str(raw: &str) -> Result<AdminLevel, UnknownAdminLevel> {
        match raw {
            "ADM3" => Ok(AdminLevel::Adm3),
            "ADM2" => Ok(AdminLevel::Adm2),
            "ADM1" => Ok(AdminLevel::Adm1),
            "ADM0" => Ok(AdminLevel::Adm0),
            other => Err(UnknownAdminLevel(other.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum BoundaryError {
    /// No boundary dataset exists for this country at any level. Expected
    /// for some countries; callers treat it as "could not resolve".
    #[error("no boundary data for country {country} at any admin level")]
    NoBoundaryData { country: String },
    #[error("boundary request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("boundary feature file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed feature collection: {0}")]
    Geojson(#[from] geojson::Error),
    #[error("malformed boundary feature: {0}")]
    MalformedFeature(&'static str),
}

/// One polygon/multipolygon region from a boundary dataset, parsed into
/// `geo` geometry so containment checks don't re-read GeoJSON per site.
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    pub shape_id: String,
    pub geometry: geo_types::Geometry<f64>,
}

#[derive(Debug, Deserialize)]
struct BoundaryMeta {
    #[serde(rename = "gjDownloadURL")]
    gj_download_url: String,
}

/// Looks up and caches administrative-boundary feature collections per
/// country. Two bounded LRU caches sit in front of the network: resolved
/// download URLs keyed by country, and parsed feature sets keyed by URL.
/// Fetched feature files also get a copy on disk keyed by resource name,
/// which survives the in-memory cache's eviction.
pub struct BoundaryResolver {
    client: reqwest::Client,
    base_url: String,
    start_level: AdminLevel,
    data_dir: PathBuf,
    url_cache: Mutex<SizedCache<String, String>>,
    feature_cache: Mutex<SizedCache<String, Arc<Vec<BoundaryFeature>>>>,
}

impl BoundaryResolver {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        start_level: AdminLevel,
        data_dir: &str,
    ) -> BoundaryResolver {
        BoundaryResolver {
            client,
            base_url: base_url.to_string(),
            start_level,
            data_dir: PathBuf::from(data_dir),
            url_cache: Mutex::new(SizedCache::with_size(URL_CACHE_SIZE)),
            feature_cache: Mutex::new(SizedCache::with_size(FEATURE_CACHE_SIZE)),
        }
    }

    /// Boundary features for a country: URL resolution plus feature fetch.
    pub async fn load_boundary_features(
        &self,
        country_code: &str,
    ) -> Result<Arc<Vec<BoundaryFeature>>, BoundaryError> {
        let url = self.resolve_boundary_url(country_code).await?;
        self.get_features(&url).await
    }

    /// Finds the feature-collection download URL for a country, starting
    /// at the configured admin level and downgrading while the metadata
    /// query comes back empty. Runs out of levels -> `NoBoundaryData`.
    pub async fn resolve_boundary_url(
        &self,
        country_code: &str,
    ) -> Result<String, BoundaryError> {
        if let Some(hit) = self
            .url_cache
            .lock()
            .unwrap()
            .cache_get(&country_code.to_string())
            .cloned()
        {
            return Ok(hit);
        }

        info!("Fetching geoboundary resource for {}", country_code);
        let mut level = self.start_level;
        loop {
            let url = format!("{}?ISO={}&ADM={}", self.base_url, country_code, level);
            info!("Using URL: {}", url);
            let matches: Vec<BoundaryMeta> = self
                .client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if let Some(meta) = matches.into_iter().next() {
                self.url_cache
                    .lock()
                    .unwrap()
                    .cache_set(country_code.to_string(), meta.gj_download_url.clone());
                return Ok(meta.gj_download_url);
            }

            info!("{} not available, downgrading", level);
            level = match level.downgrade() {
                Some(next) => next,
                None => {
                    return Err(BoundaryError::NoBoundaryData {
                        country: country_code.to_string(),
                    });
                }
            };
        }
    }

    /// Features behind a resolved download URL. Checks the in-memory LRU,
    /// then the file copy under the data dir, then the network (persisting
    /// a file copy on the way through). Parse failures are typed errors
    /// and are not retried here.
    pub async fn get_features(
        &self,
        geo_resource_url: &str,
    ) -> Result<Arc<Vec<BoundaryFeature>>, BoundaryError> {
        if let Some(hit) = self
            .feature_cache
            .lock()
            .unwrap()
            .cache_get(&geo_resource_url.to_string())
            .cloned()
        {
            return Ok(hit);
        }

        let name = resource_name(geo_resource_url);
        let path = self.data_dir.join(name);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                info!("Using cache for: {}", name);
                raw
            }
            Err(_) => {
                info!("No cached features for: {}", name);
                self.fetch_boundary_resource(geo_resource_url, &path).await?
            }
        };

        let features = Arc::new(parse_features(&raw)?);
        self.feature_cache
            .lock()
            .unwrap()
            .cache_set(geo_resource_url.to_string(), Arc::clone(&features));
        Ok(features)
    }

    async fn fetch_boundary_resource(
        &self,
        geo_resource_url: &str,
        path: &Path,
    ) -> Result<String, BoundaryError> {
        info!("Fetching geoboundary features from: {}", geo_resource_url);
        let raw = self
            .client
            .get(geo_resource_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::write(path, &raw).await?;
        Ok(raw)
    }
}

fn parse_features(raw: &str) -> Result<Vec<BoundaryFeature>, BoundaryError> {
    let collection: geojson::FeatureCollection = raw.parse()?;
    let mut features = Vec::with_capacity(collection.features.len());
    for feature in &collection.features {
        let shape_id = feature
            .property("shapeID")
            .and_then(|value| value.as_str())
            .ok_or(BoundaryError::MalformedFeature("missing shapeID property"))?
            .to_string();
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or(BoundaryError::MalformedFeature("missing geometry"))?;
        let geometry = geo_types::Geometry::<f64>::try_from(geometry)?;
        features.push(BoundaryFeature { shape_id, geometry });
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downgrade_walks_adm3_to_adm0() {
        assert_eq!(AdminLevel::Adm3.downgrade(), Some(AdminLevel::Adm2));
        assert_eq!(AdminLevel::Adm2.downgrade(), Some(AdminLevel::Adm1));
        assert_eq!(AdminLevel::Adm1.downgrade(), Some(AdminLevel::Adm0));
        assert_eq!(AdminLevel::Adm0.downgrade(), None);
    }

    #[test]
    fn admin_level_parses_known_strings_only() {
        assert_eq!("ADM3".parse::<AdminLevel>().unwrap(), AdminLevel::Adm3);
        assert_eq!("ADM0".parse::<AdminLevel>().unwrap(), AdminLevel::Adm0);
        assert!("ADM4".parse::<AdminLevel>().is_err());
        assert!("adm3".parse::<AdminLevel>().is_err());
    }

    #[test]
    fn parse_features_reads_shape_id_and_geometry() {
        let raw = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"shapeID": "SHAPE-1"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]]
                }
            }]
        })
        .to_string();
        let features = parse_features(&raw).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].shape_id, "SHAPE-1");
    }

    #[test]
    fn parse_features_flags_missing_shape_id() {
        let raw = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                }
            }]
        })
        .to_string();
        assert!(matches!(
            parse_features(&raw),
            Err(BoundaryError::MalformedFeature(_))
        ));
    }

    #[test]
    fn parse_features_rejects_non_geojson() {
        assert!(parse_features("{\"networks\": []}").is_err());
    }
}
