use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::dead_letter::DeadLetterStore;
use crate::models::{NetworkDetailResponse, NetworkListResponse, Site};
use crate::storage::{SiteStore, StoreError};

/// Failure of the one seed call that discovers the network detail URLs.
/// There is nothing to retry against, so callers abort the run.
#[derive(Error, Debug)]
#[error("master site discovery failed: {0}")]
pub struct SeedError(#[from] reqwest::Error);

#[derive(Error, Debug)]
pub enum MakeSiteError {
    #[error("payload decode failed: {0}")]
    Payload(#[from] reqwest::Error),
    #[error("unknown country code: {0}")]
    UnknownCountry(String),
    #[error("failed to save site: {0}")]
    Store(#[from] StoreError),
}

/// Discovers the detail URL of every live network.
///
/// This request seeds the entire ETL process, so if it fails all bets are
/// off; the pipeline propagates the error instead of degrading.
pub async fn load_master_site_urls(
    client: &reqwest::Client,
    base: &str,
) -> Result<Vec<String>, SeedError> {
    let filter_uri = format!("{}/networks?fields=href,location", base);
    let list: NetworkListResponse = client
        .get(&filter_uri)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(list
        .networks
        .into_iter()
        .map(|network| format!("{}{}", base, network.href))
        .collect())
}

/// Fetches one batch of network detail URLs concurrently, each request
/// under its own timeout, and upserts a `Site` per station.
///
/// Failures are isolated per URL: transport errors, non-success statuses,
/// malformed payloads and store errors all push that one URL onto the
/// dead-letter queue and leave the rest of the batch alone. Successful
/// upserts from a partially failed batch stay in place.
pub async fn extract_batch<S: SiteStore>(
    client: &reqwest::Client,
    urls: &[String],
    timeout: Duration,
    store: &S,
    dlq: &DeadLetterStore,
) {
    let responses: Vec<(&String, Result<reqwest::Response, reqwest::Error>)> =
        futures::stream::iter(urls.iter().map(|url| {
            let client = client.clone();
            async move {
                let result = client.get(url).timeout(timeout).send().await;
                (url, result)
            }
        }))
        .buffer_unordered(urls.len().max(1))
        .collect()
        .await;

    for (url, result) in responses {
        process_response(url, result, store, dlq).await;
    }
}

async fn process_response<S: SiteStore>(
    url: &str,
    result: Result<reqwest::Response, reqwest::Error>,
    store: &S,
    dlq: &DeadLetterStore,
) {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            warn!("Request failed for {}, reason: {}", url, e);
            dlq.push_url(url);
            return;
        }
    };
    if !response.status().is_success() {
        warn!("Bad response {} for {}", response.status(), url);
        dlq.push_url(url);
        return;
    }
    if let Err(e) = make_sites(url, response, store).await {
        warn!("Error processing site at {}: {}", url, e);
        dlq.push_url(url);
    }
}

async fn make_sites<S: SiteStore>(
    url: &str,
    response: reqwest::Response,
    store: &S,
) -> Result<(), MakeSiteError> {
    let data: NetworkDetailResponse = response.json().await?;
    let sites = sites_from_detail(data)?;
    info!("Processing site at {}: {} station(s)", url, sites.len());
    for site in sites {
        store.upsert_site(site).await?;
    }
    Ok(())
}

/// Builds `Site` rows from one network detail payload, converting the
/// upstream ISO 3166 alpha-2 country code to alpha-3.
pub fn sites_from_detail(data: NetworkDetailResponse) -> Result<Vec<Site>, MakeSiteError> {
    let network = data.network;
    let country = alpha2_to_alpha3(&network.location.country)
        .ok_or_else(|| MakeSiteError::UnknownCountry(network.location.country.clone()))?;
    Ok(network
        .stations
        .into_iter()
        .map(|station| Site {
            id: format!("{}-{}", network.id, station.id),
            city: network.location.city.clone(),
            country: country.clone(),
            latitude: station.latitude,
            longitude: station.longitude,
            name: station.name,
            last_updated: station.timestamp.as_deref().and_then(parse_timestamp),
            used: station.empty_slots.unwrap_or(0),
            available: station.free_bikes.unwrap_or(0),
            admin_area: None,
        })
        .collect())
}

fn alpha2_to_alpha3(alpha2: &str) -> Option<String> {
    rust_iso3166::from_alpha2(&alpha2.to_ascii_uppercase())
        .map(|country| country.alpha3.to_string())
}

// Upstream timestamps are RFC 3339; anything else is dropped rather than
// failing the whole network payload.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
