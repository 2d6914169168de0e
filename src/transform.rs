use geo::Contains;
use geo_types::Point;
use tracing::{info, warn};

use crate::boundary::{BoundaryFeature, BoundaryResolver};
use crate::dead_letter::DeadLetterStore;
use crate::models::Site;
use crate::storage::{SiteStore, StoreError};

/// Check if a coordinate is within an area. Interior containment: a point
/// exactly on the boundary does not count as inside.
pub fn poly_check(latitude: f64, longitude: f64, area: &geo_types::Geometry<f64>) -> bool {
    let point = Point::new(longitude, latitude); // Notice reverse Lat/Long order
    area.contains(&point)
}

/// First feature (in source order) containing the coordinate, if any.
/// First match wins; overlapping features are not disambiguated, so the
/// outcome is deterministic for a fixed feature order.
pub fn match_admin_area(
    features: &[BoundaryFeature],
    latitude: f64,
    longitude: f64,
) -> Option<&str> {
    features
        .iter()
        .find(|feature| poly_check(latitude, longitude, &feature.geometry))
        .map(|feature| feature.shape_id.as_str())
}

/// Resolves the admin area of every site that does not have one yet.
/// Sites that cannot be resolved get the sentinel value and land on the
/// admin dead-letter queue for the final report.
pub async fn resolve_admin_areas<S: SiteStore>(
    store: &S,
    resolver: &BoundaryResolver,
    dlq: &DeadLetterStore,
    no_admin_sentinel: &str,
) -> Result<(), StoreError> {
    info!("Processing admin areas from Site data");
    let sites = store.sites_missing_admin_area().await?;
    info!("{} sites identified with no admin area", sites.len());
    for site in sites {
        if !identify_admin_area(&site, store, resolver, no_admin_sentinel).await? {
            dlq.push_site_id(&site.id);
        }
    }
    Ok(())
}

/// Scans the site's country boundary features for one containing its
/// coordinates. Missing boundary data and malformed feature files both
/// count as "could not resolve", never as run failures.
async fn identify_admin_area<S: SiteStore>(
    site: &Site,
    store: &S,
    resolver: &BoundaryResolver,
    no_admin_sentinel: &str,
) -> Result<bool, StoreError> {
    info!("Identifying admin area for Site: {}", site.id);
    let features = match resolver.load_boundary_features(&site.country).await {
        Ok(features) => features,
        Err(e) => {
            warn!("No usable boundary data for {}: {}", site.country, e);
            store.set_admin_area(&site.id, no_admin_sentinel).await?;
            return Ok(false);
        }
    };
    match match_admin_area(&features, site.latitude, site.longitude) {
        Some(shape_id) => {
            info!("Identified admin area for Site {}: {}", site.id, shape_id);
            // first containing feature wins, stop scanning
            store.set_admin_area(&site.id, shape_id).await?;
            Ok(true)
        }
        None => {
            // Unable to identify admin area, annotate accordingly
            store.set_admin_area(&site.id, no_admin_sentinel).await?;
            Ok(false)
        }
    }
}
