use thiserror::Error;
use tracing::info;

use crate::boundary::BoundaryResolver;
use crate::chunking::chunks;
use crate::config::LoaderConfig;
use crate::dead_letter::{DeadLetterReport, DeadLetterStore};
use crate::extract::{SeedError, extract_batch, load_master_site_urls};
use crate::storage::{SiteStore, StoreError};
use crate::transform::resolve_admin_areas;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Seed discovery failed; the run never started.
    #[error(transparent)]
    Seed(#[from] SeedError),
    /// The store broke outside an extraction batch (extraction-time store
    /// errors are dead-lettered, not propagated).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One-shot ETL run over the live network data.
///
/// Seeds the detail URL list, then alternates extraction and admin-area
/// transformation one chunk at a time so at most one un-transformed batch
/// ever accumulates. Failed URLs collect on the dead-letter queue and get
/// a bounded number of full drain-and-retry rounds; whatever survives the
/// budget is reported, never silently dropped.
pub struct Pipeline<'a, S: SiteStore> {
    config: LoaderConfig,
    client: reqwest::Client,
    resolver: BoundaryResolver,
    dlq: DeadLetterStore,
    store: &'a S,
}

impl<'a, S: SiteStore> Pipeline<'a, S> {
    pub fn new(config: LoaderConfig, client: reqwest::Client, store: &'a S) -> Pipeline<'a, S> {
        let resolver = BoundaryResolver::new(
            client.clone(),
            &config.geo_boundaries_base,
            config.admin_area_level,
            &config.boundary_data_dir,
        );
        Pipeline {
            config,
            client,
            resolver,
            dlq: DeadLetterStore::new(),
            store,
        }
    }

    /// Drives the whole run and returns what was left unresolved.
    pub async fn run(&self) -> Result<DeadLetterReport, PipelineError> {
        info!("Loading master site data...");
        let master_site_urls =
            load_master_site_urls(&self.client, &self.config.city_bike_base).await?;
        info!(
            "Extracting site data, chunk-size={} timeout={:?}",
            self.config.site_chunk_size, self.config.response_timeout
        );
        self.extract_and_transform(master_site_urls).await?;

        for retry in 0..self.config.processing_retry_count {
            let retry_urls = self.dlq.drain_urls();
            if retry_urls.is_empty() {
                info!("DLQ cleared!");
                break;
            }
            info!(
                "DLQ retry round {}: {} url(s)",
                retry + 1,
                retry_urls.len()
            );
            self.extract_and_transform(retry_urls).await?;
        }

        Ok(self.dlq.report())
    }

    /// Extracting/Transforming alternation: each batch is followed by a
    /// full admin-area sweep before the next chunk is pulled.
    async fn extract_and_transform(&self, urls: Vec<String>) -> Result<(), PipelineError> {
        for batch in chunks(urls, self.config.site_chunk_size) {
            extract_batch(
                &self.client,
                &batch,
                self.config.response_timeout,
                self.store,
                &self.dlq,
            )
            .await;
            resolve_admin_areas(
                self.store,
                &self.resolver,
                &self.dlq,
                &self.config.no_admin_area,
            )
            .await?;
        }
        info!("Chunks exhausted!");
        Ok(())
    }
}
