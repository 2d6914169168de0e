use std::collections::VecDeque;
use std::sync::Mutex;

use itertools::Itertools;
use tracing::info;

/// Dead-letter queues for the two failure kinds the loader produces:
/// detail URLs whose extraction failed, and site IDs whose admin area
/// could not be determined.
///
/// One instance is constructed per run and handed to the pipeline, the
/// extractor and the transformer. Enqueueing is safe from the concurrent
/// fetch workers inside a batch; draining is non-blocking and atomic per
/// queue. Nothing is dropped: every entry is either drained for a retry
/// round or surfaced by `report`.
#[derive(Debug, Default)]
pub struct DeadLetterStore {
    unprocessed_urls: Mutex<VecDeque<String>>,
    no_admin_site_ids: Mutex<VecDeque<String>>,
}

/// Leftover entries at the end of a run, as emitted by `report`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeadLetterReport {
    pub unprocessed_urls: Vec<String>,
    pub no_admin_site_ids: Vec<String>,
}

impl DeadLetterStore {
    pub fn new() -> DeadLetterStore {
        DeadLetterStore::default()
    }

    pub fn push_url(&self, url: &str) {
        info!("Adding url to dead letter queue: {}", url);
        self.unprocessed_urls
            .lock()
            .unwrap()
            .push_back(url.to_string());
    }

    pub fn push_site_id(&self, site_id: &str) {
        info!("Adding site to admin dead letter queue: {}", site_id);
        self.no_admin_site_ids
            .lock()
            .unwrap()
            .push_back(site_id.to_string());
    }

    /// Removes and returns every queued URL, oldest first. Empty queue
    /// drains to an empty Vec.
    pub fn drain_urls(&self) -> Vec<String> {
        self.unprocessed_urls.lock().unwrap().drain(..).collect()
    }

    /// Removes and returns every queued site ID, oldest first.
    pub fn drain_site_ids(&self) -> Vec<String> {
        self.no_admin_site_ids.lock().unwrap().drain(..).collect()
    }

    /// Drains both queues and logs whatever is left for the operator.
    /// Called once at the end of a run.
    pub fn report(&self) -> DeadLetterReport {
        let report = DeadLetterReport {
            unprocessed_urls: self.drain_urls(),
            no_admin_site_ids: self.drain_site_ids(),
        };
        info!(
            "The following urls were not processed:\n{}",
            report.unprocessed_urls.iter().join("\n")
        );
        info!(
            "Admin area could not be identified for these sites:\n{}",
            report.no_admin_site_ids.iter().join("\n")
        );
        report
    }
}
