//! Query layer: runs a search against the configured backend and enriches the
//! page with grouping counts, active/ended counts, and per-result tone.

mod aggregate;
mod backend;
mod error;

pub use aggregate::{
    Aggregator, EnrichedResult, SearchMetadata, SearchReport, SearchRequest, UNSPECIFIED,
    summarize,
};
pub use backend::{BackendPage, LiveBackend, LocalBackend, SearchBackend, SearchMode};
pub use error::QueryError;
