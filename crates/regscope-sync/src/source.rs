//! The seam between the pipeline and wherever pages of results come from.

use async_trait::async_trait;
use regscope_core::SourcePage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid source URL: {0}")]
    InvalidUrl(String),
}

/// Query parameters of the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub per_page: u32,
    /// 1-based.
    pub page: u32,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub paginate_by: Option<String>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>, per_page: u32, page: u32) -> Self {
        Self {
            query: query.into(),
            per_page,
            page,
            order: None,
            paginate_by: None,
        }
    }

    /// Key/value pairs in the order the endpoint documents them; unset
    /// optional parameters are omitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("query", self.query.clone()),
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
        ];
        if let Some(order) = &self.order {
            pairs.push(("order", order.clone()));
        }
        if let Some(paginate_by) = &self.paginate_by {
            pairs.push(("paginate_by", paginate_by.clone()));
        }
        pairs
    }
}

/// A paginated source of raw regulation results.
#[async_trait]
pub trait RegulationSource: Send + Sync {
    async fn fetch_page(&self, params: &SearchParams) -> Result<SourcePage, SourceError>;
}
