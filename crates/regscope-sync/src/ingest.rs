//! Ingestion pipeline: page through the source, normalise, write to the store.

use std::time::{Duration, Instant};

use regscope_store::{RegulationStore, StoreError, UpsertMode};
use thiserror::Error;
use tracing::{info, warn};

use crate::source::{RegulationSource, SearchParams, SourceError};

/// Fixed pause between page requests, as a courtesy to the source.
pub const PAGE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("first page request failed: {0}")]
    FirstPage(#[source] SourceError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// What to pull and how to write it.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Search term sent to the source; `*` means everything.
    pub query: String,
    pub per_page: u32,
    pub mode: UpsertMode,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            query: "*".into(),
            per_page: 100,
            mode: UpsertMode::Append,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    /// Page count declared by the first response.
    pub total_pages: u32,
    /// Records written to the store.
    pub processed: usize,
    /// Records dropped as malformed or rejected by the store.
    pub skipped: usize,
    /// Pages whose request failed; their records are missing.
    pub failed_pages: Vec<u32>,
    pub elapsed_secs: f64,
}

/// Run a full ingestion: page 1 declares the page count, then pages
/// `2..=total_pages` are requested one after another with [`PAGE_DELAY`]
/// between requests.
///
/// Only a failed first page fails the run. Later page failures are logged,
/// recorded in [`IngestStats::failed_pages`] and skipped without retry beyond
/// what the source does itself.
pub async fn run_ingest(
    source: &dyn RegulationSource,
    store: &mut RegulationStore,
    options: &IngestOptions,
) -> Result<IngestStats, IngestError> {
    let start = Instant::now();
    let mut params = SearchParams::new(options.query.clone(), options.per_page, 1);

    info!(query = %options.query, per_page = options.per_page, "starting ingestion");
    let first = source
        .fetch_page(&params)
        .await
        .map_err(IngestError::FirstPage)?;

    let total_pages = first.total_pages;
    let mut stats = IngestStats {
        total_pages,
        ..Default::default()
    };
    let mut pending = Some(first);

    for page in 1..=total_pages.max(1) {
        let response = match pending.take() {
            Some(response) => response,
            None => {
                tokio::time::sleep(PAGE_DELAY).await;
                params.page = page;
                match source.fetch_page(&params).await {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(page, error = %e, "page request failed, skipping");
                        stats.failed_pages.push(page);
                        continue;
                    }
                }
            }
        };

        info!(page, total_pages, results = response.results.len(), "processing page");

        let mut records = Vec::with_capacity(response.results.len());
        for (index, raw) in response.results.iter().enumerate() {
            match raw.normalize() {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(page, index, error = %e, "skipping malformed record");
                    stats.skipped += 1;
                }
            }
        }

        let report = store.upsert_many(&records, options.mode)?;
        stats.processed += report.written;
        stats.skipped += report.skipped;
        info!(processed = stats.processed, "records stored");
    }

    stats.elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        processed = stats.processed,
        skipped = stats.skipped,
        failed_pages = stats.failed_pages.len(),
        elapsed_secs = stats.elapsed_secs,
        "ingestion complete"
    );
    Ok(stats)
}
