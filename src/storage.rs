use std::collections::BTreeMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::models::Site;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("no site with id {0}")]
    UnknownSite(String),
}

/// Persistence collaborator for `Site` records.
///
/// The loader only ever needs three things from its store: an idempotent
/// merge keyed by site ID, the set of sites still waiting for an admin
/// area, and the admin-area update itself. Anything with those semantics
/// (a relational table, a KV store) can sit behind this trait.
#[allow(async_fn_in_trait)]
pub trait SiteStore {
    /// Insert or fully replace the site with the same ID.
    async fn upsert_site(&self, site: Site) -> Result<(), StoreError>;

    /// Every site whose `admin_area` is still `None`.
    async fn sites_missing_admin_area(&self) -> Result<Vec<Site>, StoreError>;

    /// Set `admin_area` for one site. The only mutation applied after a
    /// site is first written.
    async fn set_admin_area(&self, site_id: &str, admin_area: &str) -> Result<(), StoreError>;
}

/// Process-lifetime store, also the test double. Ordered by site ID so
/// scans are deterministic.
#[derive(Debug, Default)]
pub struct MemorySiteStore {
    sites: Mutex<BTreeMap<String, Site>>,
}

impl MemorySiteStore {
    pub fn new() -> MemorySiteStore {
        MemorySiteStore::default()
    }

    pub fn site(&self, site_id: &str) -> Option<Site> {
        self.sites.lock().unwrap().get(site_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sites.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SiteStore for MemorySiteStore {
    async fn upsert_site(&self, site: Site) -> Result<(), StoreError> {
        self.sites.lock().unwrap().insert(site.id.clone(), site);
        Ok(())
    }

    async fn sites_missing_admin_area(&self) -> Result<Vec<Site>, StoreError> {
        Ok(self
            .sites
            .lock()
            .unwrap()
            .values()
            .filter(|site| site.admin_area.is_none())
            .cloned()
            .collect())
    }

    async fn set_admin_area(&self, site_id: &str, admin_area: &str) -> Result<(), StoreError> {
        match self.sites.lock().unwrap().get_mut(site_id) {
            Some(site) => {
                site.admin_area = Some(admin_area.to_string());
                Ok(())
            }
            None => Err(StoreError::UnknownSite(site_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str) -> Site {
        Site {
            id: id.to_string(),
            city: "Gotham".to_string(),
            country: "USA".to_string(),
            latitude: 40.0,
            longitude: -74.0,
            name: None,
            last_updated: None,
            used: 0,
            available: 0,
            admin_area: None,
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_id() {
        let store = MemorySiteStore::new();
        store.upsert_site(site("n-1")).await.unwrap();
        let mut updated = site("n-1");
        updated.available = 7;
        store.upsert_site(updated).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.site("n-1").unwrap().available, 7);
    }

    #[tokio::test]
    async fn missing_admin_area_query_skips_resolved_sites() {
        let store = MemorySiteStore::new();
        store.upsert_site(site("n-1")).await.unwrap();
        store.upsert_site(site("n-2")).await.unwrap();
        store.set_admin_area("n-1", "SHAPE-1").await.unwrap();
        let pending = store.sites_missing_admin_area().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "n-2");
    }

    #[tokio::test]
    async fn set_admin_area_on_unknown_site_fails() {
        let store = MemorySiteStore::new();
        assert!(store.set_admin_area("nope", "SHAPE-1").await.is_err());
    }
}
