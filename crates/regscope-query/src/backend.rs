//! Where a search runs: the local DuckDB store or the live eCFR API.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use regscope_core::{Regulation, dedupe_by_section_excerpt, sort_ended_first};
use regscope_store::{RegulationStore, StoreError};
use regscope_sync::{RegulationSource, SearchParams};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::SearchRequest;
use crate::error::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Substring search over previously ingested records.
    Local,
    /// Every search is proxied to the eCFR API.
    Live,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Live => "live",
        }
    }
}

/// Raw page of matches before enrichment.
#[derive(Debug, Clone, Default)]
pub struct BackendPage {
    pub regulations: Vec<Regulation>,
    /// Matches across all pages, when the backend knows it.
    pub total_count: Option<u64>,
    pub total_pages: u32,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn mode(&self) -> SearchMode;

    /// Run a validated request.
    async fn search(&self, request: &SearchRequest) -> Result<BackendPage, QueryError>;
}

/// Local-store mode.
///
/// A file-backed backend ([`open_per_search`](Self::open_per_search)) opens a
/// read-only connection for each search and closes it afterwards, so a
/// separate `regscope ingest` can take the write lock between searches. A
/// search that lands while that ingest holds the file fails with a store
/// error. [`new`](Self::new) keeps one root connection and clones it per
/// search; in-memory databases have no file to reopen, so they need it.
pub struct LocalBackend {
    connector: Connector,
}

enum Connector {
    Shared(Mutex<RegulationStore>),
    File(PathBuf),
}

/// Where the blocking task gets its connection from.
enum Handle {
    Ready(RegulationStore),
    Open(PathBuf),
}

impl Handle {
    fn connect(self) -> Result<RegulationStore, StoreError> {
        match self {
            Self::Ready(store) => Ok(store),
            Self::Open(path) => RegulationStore::open_read_only(&path),
        }
    }
}

impl LocalBackend {
    pub fn new(store: RegulationStore) -> Self {
        Self {
            connector: Connector::Shared(Mutex::new(store)),
        }
    }

    /// Search the database file at `path`; it must already be initialized.
    pub fn open_per_search(path: impl Into<PathBuf>) -> Self {
        Self {
            connector: Connector::File(path.into()),
        }
    }

    fn handle(&self) -> Result<Handle, StoreError> {
        Ok(match &self.connector {
            Connector::Shared(root) => Handle::Ready(root.lock().try_clone()?),
            Connector::File(path) => Handle::Open(path.clone()),
        })
    }
}

#[async_trait]
impl SearchBackend for LocalBackend {
    fn mode(&self) -> SearchMode {
        SearchMode::Local
    }

    async fn search(&self, request: &SearchRequest) -> Result<BackendPage, QueryError> {
        if request.order.is_some() || request.paginate_by.is_some() {
            debug!("order/paginate_by are ignored in local mode");
        }
        let handle = self.handle()?;
        let query = request.query.clone();
        let (page, per_page) = (request.page, request.per_page);

        let found = tokio::task::spawn_blocking(move || {
            handle.connect()?.search(&query, page, per_page)
        })
        .await
        .map_err(|e| QueryError::Task(e.to_string()))??;

        Ok(BackendPage {
            regulations: found.regulations,
            total_count: Some(found.total_count),
            total_pages: found.total_pages,
        })
    }
}

/// Live-proxy mode.
///
/// Results are collapsed on `(section, trimmed excerpt)` and put in
/// `ends_on.is_none()` order (ended first); see
/// [`regscope_core::ordering`].
pub struct LiveBackend {
    source: Arc<dyn RegulationSource>,
}

impl LiveBackend {
    pub fn new(source: Arc<dyn RegulationSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl SearchBackend for LiveBackend {
    fn mode(&self) -> SearchMode {
        SearchMode::Live
    }

    async fn search(&self, request: &SearchRequest) -> Result<BackendPage, QueryError> {
        let params = SearchParams {
            order: request.order.clone(),
            paginate_by: request.paginate_by.clone(),
            ..SearchParams::new(request.query.clone(), request.per_page, request.page)
        };
        let page = self.source.fetch_page(&params).await?;

        let mut regulations = Vec::with_capacity(page.results.len());
        for (index, raw) in page.results.iter().enumerate() {
            match raw.normalize() {
                Ok(r) => regulations.push(r),
                Err(e) => warn!(index, error = %e, "dropping malformed live result"),
            }
        }
        let raw_count = regulations.len();
        let mut regulations = dedupe_by_section_excerpt(regulations);
        sort_ended_first(&mut regulations);
        debug!(raw_count, kept = regulations.len(), "live results deduplicated");

        Ok(BackendPage {
            regulations,
            total_count: None,
            total_pages: page.total_pages,
        })
    }
}
