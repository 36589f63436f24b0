//! HTTP client for the eCFR search and versioner APIs.

use std::time::Duration;

use async_trait::async_trait;
use regscope_core::SourcePage;
use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, info};

use crate::retry::{RetryPolicy, send_with_retry};
use crate::source::{RegulationSource, SearchParams, SourceError};

const SEARCH_PATH: &[&str] = &["api", "search", "v1", "results"];
const VERSIONER_PATH: &[&str] = &["api", "versioner", "v1", "full"];

/// Connection settings for [`EcfrClient`].
#[derive(Debug, Clone)]
pub struct EcfrConfig {
    /// Like `https://www.ecfr.gov` (no trailing slash needed).
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for EcfrConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ecfr.gov".into(),
            timeout_secs: 30,
            user_agent: concat!("regscope/", env!("CARGO_PKG_VERSION")).into(),
            retry: RetryPolicy::default(),
        }
    }
}

/// eCFR API client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct EcfrClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl EcfrClient {
    pub fn new(config: EcfrConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
        })
    }

    /// One page of search results.
    pub async fn search(&self, params: &SearchParams) -> Result<SourcePage, SourceError> {
        let url = self.url(SEARCH_PATH.iter().copied())?;
        let pairs = params.to_pairs();

        debug!(url = %url, page = params.page, per_page = params.per_page, "searching eCFR");
        let resp = self.get(&url, &pairs).await?;
        let bytes = resp.bytes().await?;
        let page: SourcePage = serde_json::from_slice(&bytes)?;
        debug!(
            results = page.results.len(),
            total_pages = page.total_pages,
            "eCFR search page received"
        );
        Ok(page)
    }

    /// Full text of one title/part as it stood on `date` (`YYYY-MM-DD`).
    pub async fn fetch_version(
        &self,
        title: &str,
        part: &str,
        date: &str,
    ) -> Result<String, SourceError> {
        let file = format!("title-{title}.xml");
        let segments = VERSIONER_PATH.iter().copied().chain([date, file.as_str()]);
        let url = self.url(segments)?;

        info!(url = %url, part, "fetching eCFR version");
        let resp = self.get(&url, &[("part", part.to_string())]).await?;
        Ok(resp.text().await?)
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, SourceError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| SourceError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| SourceError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, SourceError> {
        let resp =
            send_with_retry(self.retry, || self.client.get(url.clone()).query(query).send())
                .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl RegulationSource for EcfrClient {
    async fn fetch_page(&self, params: &SearchParams) -> Result<SourcePage, SourceError> {
        self.search(params).await
    }
}
