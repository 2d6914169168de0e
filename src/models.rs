use chrono::{DateTime, Utc};
use serde_derive::Deserialize;
use serde_derive::Serialize;

/// One bike-share station, keyed by `{network_id}-{station_id}`.
///
/// `admin_area` starts out as `None`, and is only ever set by the
/// admin-area transform: either to the shape ID of the containing
/// boundary feature, or to the configured sentinel when no feature
/// contains the station's coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Site {
    pub id: String,
    pub city: String,
    /// ISO 3166 alpha-3 country code.
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Bikes in use (`empty_slots` upstream).
    pub used: i32,
    /// Bikes available (`free_bikes` upstream).
    pub available: i32,
    pub admin_area: Option<String>,
}

// Wire formats for the network discovery + detail endpoints.

#[derive(Debug, Deserialize)]
pub struct NetworkListResponse {
    pub networks: Vec<NetworkRef>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkRef {
    pub href: String,
}

#[derive(Debug, Deserialize)]
pub struct NetworkDetailResponse {
    pub network: NetworkDetail,
}

#[derive(Debug, Deserialize)]
pub struct NetworkDetail {
    pub id: String,
    pub location: NetworkLocation,
    pub stations: Vec<StationPayload>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkLocation {
    pub city: String,
    /// ISO 3166 alpha-2 country code as served upstream.
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct StationPayload {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub timestamp: Option<String>,
    pub empty_slots: Option<i32>,
    pub free_bikes: Option<i32>,
}
