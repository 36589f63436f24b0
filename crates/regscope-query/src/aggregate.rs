//! Search aggregation: validate → backend search → counts → tone.

use std::collections::BTreeMap;
use std::sync::Arc;

use regscope_ai::{SentimentScorer, Tone, ToneCounts};
use regscope_core::Regulation;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::{BackendPage, SearchBackend, SearchMode};
use crate::error::QueryError;

/// Grouping key for results without a title or part.
pub const UNSPECIFIED: &str = "unspecified";

const EMPTY_QUERY_MESSAGE: &str = "Please enter a search term.";

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

/// A user search. Deserializes from `?query=&page=&per_page=&order=&paginate_by=`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Passed through to the live source; ignored locally.
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub paginate_by: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: default_page(),
            per_page: default_per_page(),
            order: None,
            paginate_by: None,
        }
    }

    /// Trimmed copy, or a validation error for an empty query or zero paging.
    /// Blank `order`/`paginate_by` become `None`.
    pub fn validated(&self) -> Result<Self, QueryError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(QueryError::Validation(EMPTY_QUERY_MESSAGE.into()));
        }
        if self.page == 0 {
            return Err(QueryError::Validation("page must be at least 1".into()));
        }
        if self.per_page == 0 {
            return Err(QueryError::Validation("per_page must be at least 1".into()));
        }
        Ok(Self {
            query: query.to_string(),
            page: self.page,
            per_page: self.per_page,
            order: non_blank(&self.order),
            paginate_by: non_blank(&self.paginate_by),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// A result with its tone attached.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub regulation: Regulation,
    pub tone: Tone,
    /// Compound sentiment score behind `tone`.
    pub compound: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMetadata {
    /// Results on this page, after any deduplication.
    pub total_results: usize,
    /// Matches across all pages; only known in local mode.
    pub total_count: Option<u64>,
    pub active_count: usize,
    pub ended_count: usize,
    pub num_pages: u32,
    pub current_page: u32,
    pub mode: SearchMode,
}

/// Everything the presentation layer renders for one search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub results: Vec<EnrichedResult>,
    pub metadata: SearchMetadata,
    pub title_stats: BTreeMap<String, usize>,
    pub part_stats: BTreeMap<String, usize>,
    pub tone_counts: ToneCounts,
}

/// Search front door shared by the web surface and the CLI.
///
/// The backend decides local-store vs live-proxy mode; the scorer is built
/// once at startup and shared.
pub struct Aggregator {
    backend: Box<dyn SearchBackend>,
    scorer: Arc<dyn SentimentScorer>,
}

impl Aggregator {
    pub fn new(backend: impl SearchBackend + 'static, scorer: Arc<dyn SentimentScorer>) -> Self {
        Self {
            backend: Box::new(backend),
            scorer,
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.backend.mode()
    }

    /// Validate, search, and enrich. Validation failures never reach the backend.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchReport, QueryError> {
        let request = request.validated()?;
        let page = self.backend.search(&request).await?;
        let report = summarize(page, request.page, self.mode(), self.scorer.as_ref());
        info!(
            query = %request.query,
            mode = self.mode().as_str(),
            results = report.metadata.total_results,
            "search complete"
        );
        Ok(report)
    }
}

/// Compute grouping counts, active/ended counts, and tone over exactly the
/// results being returned.
pub fn summarize(
    page: BackendPage,
    current_page: u32,
    mode: SearchMode,
    scorer: &dyn SentimentScorer,
) -> SearchReport {
    let mut title_stats = BTreeMap::new();
    let mut part_stats = BTreeMap::new();
    let mut active_count = 0;
    let mut ended_count = 0;

    for r in &page.regulations {
        *title_stats.entry(group_key(&r.title)).or_insert(0) += 1;
        *part_stats.entry(group_key(&r.part)).or_insert(0) += 1;
        if r.is_ended() {
            ended_count += 1;
        } else {
            active_count += 1;
        }
    }

    let mut tone_counts = ToneCounts::default();
    let results: Vec<EnrichedResult> = page
        .regulations
        .into_iter()
        .map(|regulation| {
            let compound = scorer.compound(&regulation.full_text);
            let tone = Tone::from_compound(compound);
            tone_counts.record(tone);
            EnrichedResult {
                regulation,
                tone,
                compound,
            }
        })
        .collect();

    SearchReport {
        metadata: SearchMetadata {
            total_results: results.len(),
            total_count: page.total_count,
            active_count,
            ended_count,
            num_pages: page.total_pages,
            current_page,
            mode,
        },
        results,
        title_stats,
        part_stats,
        tone_counts,
    }
}

fn group_key(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNSPECIFIED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LiveBackend, LocalBackend};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use regscope_core::{SourcePage, SourceResult};
    use regscope_store::{RegulationStore, UpsertMode};
    use regscope_sync::{RegulationSource, SearchParams, SourceError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores text by exact lookup; unknown text is 0.0.
    struct TableScorer(HashMap<String, f64>);

    impl TableScorer {
        fn new(entries: &[(&str, f64)]) -> Arc<Self> {
            Arc::new(Self(
                entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            ))
        }
    }

    impl SentimentScorer for TableScorer {
        fn compound(&self, text: &str) -> f64 {
            self.0.get(text).copied().unwrap_or(0.0)
        }
    }

    /// Returns a fixed page and counts calls.
    struct StubBackend {
        page: BackendPage,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SearchBackend for StubBackend {
        fn mode(&self) -> SearchMode {
            SearchMode::Local
        }

        async fn search(&self, _request: &SearchRequest) -> Result<BackendPage, QueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.page.clone())
        }
    }

    fn reg(title: Option<&str>, part: Option<&str>, text: &str, ended: bool) -> Regulation {
        Regulation {
            title: title.map(String::from),
            part: part.map(String::from),
            full_text: text.into(),
            ends_on: ended.then(|| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            ..Default::default()
        }
    }

    fn stub(regulations: Vec<Regulation>) -> (StubBackend, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = StubBackend {
            page: BackendPage {
                total_count: Some(regulations.len() as u64),
                total_pages: 1,
                regulations,
            },
            calls: calls.clone(),
        };
        (backend, calls)
    }

    #[tokio::test]
    async fn empty_query_rejected_before_backend() {
        let (backend, calls) = stub(vec![]);
        let agg = Aggregator::new(backend, TableScorer::new(&[]));

        for query in ["", "   ", "\t\n"] {
            let err = agg.search(&SearchRequest::new(query)).await.unwrap_err();
            match err {
                QueryError::Validation(msg) => assert_eq!(msg, "Please enter a search term."),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_paging_rejected() {
        let (backend, calls) = stub(vec![]);
        let agg = Aggregator::new(backend, TableScorer::new(&[]));

        let mut req = SearchRequest::new("emission");
        req.page = 0;
        assert!(matches!(agg.search(&req).await, Err(QueryError::Validation(_))));
        req.page = 1;
        req.per_page = 0;
        assert!(matches!(agg.search(&req).await, Err(QueryError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn validated_trims_query() {
        let req = SearchRequest::new("  emission  ").validated().unwrap();
        assert_eq!(req.query, "emission");
    }

    #[test]
    fn blank_pass_through_params_dropped() {
        let req = SearchRequest {
            order: Some(String::new()),
            paginate_by: Some("  ".into()),
            ..SearchRequest::new("emission")
        };
        let req = req.validated().unwrap();
        assert_eq!(req.order, None);
        assert_eq!(req.paginate_by, None);

        let kept = SearchRequest {
            order: Some(" relevance ".into()),
            ..SearchRequest::new("emission")
        };
        assert_eq!(kept.validated().unwrap().order.as_deref(), Some("relevance"));
    }

    #[tokio::test]
    async fn live_mode_omits_blank_params() {
        let source = Arc::new(CannedSource {
            page: SourcePage::default(),
            seen: parking_lot::Mutex::new(None),
        });
        let agg = Aggregator::new(LiveBackend::new(source.clone()), TableScorer::new(&[]));
        let req = SearchRequest {
            order: Some(String::new()),
            paginate_by: Some(String::new()),
            ..SearchRequest::new("limits")
        };
        agg.search(&req).await.unwrap();

        let sent = source.seen.lock().clone().unwrap();
        assert_eq!(sent.order, None);
        assert_eq!(sent.paginate_by, None);
        assert!(!sent.to_pairs().iter().any(|(k, _)| *k == "order" || *k == "paginate_by"));
    }

    #[tokio::test]
    async fn grouping_and_activity_counts() {
        let (backend, _) = stub(vec![
            reg(Some("40"), Some("60"), "a", false),
            reg(Some("40"), Some("61"), "b", true),
            reg(Some("12"), Some("60"), "c", true),
            reg(None, None, "d", false),
        ]);
        let agg = Aggregator::new(backend, TableScorer::new(&[]));
        let report = agg.search(&SearchRequest::new("x")).await.unwrap();

        assert_eq!(report.title_stats["40"], 2);
        assert_eq!(report.title_stats["12"], 1);
        assert_eq!(report.title_stats[UNSPECIFIED], 1);
        assert_eq!(report.part_stats["60"], 2);
        assert_eq!(report.part_stats["61"], 1);

        let m = &report.metadata;
        assert_eq!(m.total_results, 4);
        assert_eq!(m.active_count, 2);
        assert_eq!(m.ended_count, 2);
        assert_eq!(m.num_pages, 1);
        assert_eq!(m.current_page, 1);
        assert_eq!(m.total_count, Some(4));
    }

    #[tokio::test]
    async fn ended_records_never_counted_active() {
        let regs: Vec<Regulation> = (0..10)
            .map(|i| reg(Some("1"), Some("1"), "t", i % 3 == 0))
            .collect();
        let ended = regs.iter().filter(|r| r.ends_on.is_some()).count();
        let (backend, _) = stub(regs);
        let agg = Aggregator::new(backend, TableScorer::new(&[]));
        let report = agg.search(&SearchRequest::new("t")).await.unwrap();

        assert_eq!(report.metadata.ended_count, ended);
        assert_eq!(report.metadata.active_count, 10 - ended);
        for r in &report.results {
            assert_eq!(r.regulation.is_ended(), r.regulation.ends_on.is_some());
        }
    }

    #[tokio::test]
    async fn tone_attached_per_result() {
        let (backend, _) = stub(vec![
            reg(None, None, "strict", false),
            reg(None, None, "neutral", false),
            reg(None, None, "permissive", false),
            reg(None, None, "low edge", false),
            reg(None, None, "high edge", false),
        ]);
        let scorer = TableScorer::new(&[
            ("strict", -0.5),
            ("neutral", 0.0),
            ("permissive", 0.5),
            ("low edge", -0.2),
            ("high edge", 0.2),
        ]);
        let agg = Aggregator::new(backend, scorer);
        let report = agg.search(&SearchRequest::new("x")).await.unwrap();

        let tones: Vec<Tone> = report.results.iter().map(|r| r.tone).collect();
        assert_eq!(
            tones,
            vec![
                Tone::Strict,
                Tone::Neutral,
                Tone::Permissive,
                Tone::Neutral,
                Tone::Neutral
            ]
        );
        assert_eq!(
            report.tone_counts,
            ToneCounts {
                strict: 1,
                neutral: 3,
                permissive: 1
            }
        );
        assert_eq!(report.results[0].compound, -0.5);
    }

    #[tokio::test]
    async fn report_serializes_flat_results() {
        let (backend, _) = stub(vec![reg(Some("40"), Some("60"), "text", false)]);
        let agg = Aggregator::new(backend, TableScorer::new(&[]));
        let report = agg.search(&SearchRequest::new("x")).await.unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"][0]["title"], "40");
        assert_eq!(json["results"][0]["tone"], "NEUTRAL");
        assert_eq!(json["metadata"]["mode"], "local");
        assert_eq!(json["tone_counts"]["neutral"], 1);
        assert_eq!(json["title_stats"]["40"], 1);
    }

    // ── Local-store mode ──

    fn seeded_store(n: usize) -> RegulationStore {
        let mut store = RegulationStore::open().unwrap();
        store.initialize().unwrap();
        let regs: Vec<Regulation> = (0..n)
            .map(|i| reg(Some("40"), Some("60"), &format!("emission record {i}"), i % 2 == 0))
            .collect();
        store.upsert_many(&regs, UpsertMode::Append).unwrap();
        store
    }

    #[tokio::test]
    async fn local_mode_pages_through_store() {
        let agg = Aggregator::new(LocalBackend::new(seeded_store(7)), TableScorer::new(&[]));
        let mut req = SearchRequest::new("emission");
        req.per_page = 3;

        let report = agg.search(&req).await.unwrap();
        assert_eq!(report.metadata.mode, SearchMode::Local);
        assert_eq!(report.metadata.total_results, 3);
        assert_eq!(report.metadata.total_count, Some(7));
        assert_eq!(report.metadata.num_pages, 3);
        assert!(report.results.iter().all(|r| r.regulation.id.is_some()));

        req.page = 3;
        let last = agg.search(&req).await.unwrap();
        assert_eq!(last.metadata.total_results, 1);
        assert_eq!(last.metadata.current_page, 3);
    }

    #[tokio::test]
    async fn local_mode_trims_query() {
        let agg = Aggregator::new(LocalBackend::new(seeded_store(2)), TableScorer::new(&[]));
        let report = agg.search(&SearchRequest::new("  record 1 ")).await.unwrap();
        assert_eq!(report.metadata.total_count, Some(1));
    }

    // ── Live-proxy mode ──

    struct CannedSource {
        page: SourcePage,
        seen: parking_lot::Mutex<Option<SearchParams>>,
    }

    #[async_trait]
    impl RegulationSource for CannedSource {
        async fn fetch_page(&self, params: &SearchParams) -> Result<SourcePage, SourceError> {
            *self.seen.lock() = Some(params.clone());
            Ok(self.page.clone())
        }
    }

    fn raw(section: &str, text: &str, ends_on: Option<&str>, title: &str) -> SourceResult {
        SourceResult {
            title: Some(title.into()),
            part: Some("60".into()),
            section: Some(section.into()),
            full_text_excerpt: Some(text.into()),
            ends_on: ends_on.map(Into::into),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn live_mode_dedupes_sorts_and_counts_filtered_set() {
        let source = Arc::new(CannedSource {
            page: SourcePage {
                results: vec![
                    raw("60.1", "limits apply", None, "first"),
                    raw("60.1", " limits apply ", Some("2020-01-01"), "duplicate"),
                    raw("60.2", "monitoring", Some("2019-01-01"), "ended"),
                    raw("60.3", "reporting", None, "active"),
                ],
                total_pages: 4,
            },
            seen: parking_lot::Mutex::new(None),
        });
        let agg = Aggregator::new(LiveBackend::new(source.clone()), TableScorer::new(&[]));

        let mut req = SearchRequest::new("limits");
        req.order = Some("relevance".into());
        let report = agg.search(&req).await.unwrap();

        let titles: Vec<&str> = report
            .results
            .iter()
            .map(|r| r.regulation.title.as_deref().unwrap())
            .collect();
        // Duplicate dropped (first kept), ended record moved ahead of active ones.
        assert_eq!(titles, vec!["ended", "first", "active"]);

        let m = &report.metadata;
        assert_eq!(m.mode, SearchMode::Live);
        assert_eq!(m.total_results, 3);
        assert_eq!(m.ended_count, 1);
        assert_eq!(m.active_count, 2);
        assert_eq!(m.num_pages, 4);
        assert_eq!(m.total_count, None);
        assert!(!report.title_stats.contains_key("duplicate"));

        let sent = source.seen.lock().clone().unwrap();
        assert_eq!(sent.query, "limits");
        assert_eq!(sent.order.as_deref(), Some("relevance"));
        assert_eq!(sent.per_page, 20);
    }

    #[tokio::test]
    async fn live_mode_drops_badly_typed_results() {
        let source = Arc::new(CannedSource {
            page: serde_json::from_value(serde_json::json!({
                "results": [
                    {"section": "60.1", "full_text_excerpt": "limits apply", "title": "kept"},
                    {"section": "60.2", "full_text_excerpt": "x", "hierarchy": "title 40"},
                    42
                ],
                "meta": {"total_pages": 1}
            }))
            .unwrap(),
            seen: parking_lot::Mutex::new(None),
        });
        let agg = Aggregator::new(LiveBackend::new(source), TableScorer::new(&[]));
        let report = agg.search(&SearchRequest::new("limits")).await.unwrap();

        assert_eq!(report.metadata.total_results, 1);
        assert_eq!(report.results[0].regulation.title.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn live_mode_surfaces_source_errors() {
        struct Down;

        #[async_trait]
        impl RegulationSource for Down {
            async fn fetch_page(&self, _: &SearchParams) -> Result<SourcePage, SourceError> {
                Err(SourceError::Server {
                    status: 502,
                    body: "bad gateway".into(),
                })
            }
        }

        let agg = Aggregator::new(LiveBackend::new(Arc::new(Down)), TableScorer::new(&[]));
        let err = agg.search(&SearchRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, QueryError::Source(SourceError::Server { status: 502, .. })));
    }
}
