//! Sync layer: pulling regulation excerpts from the eCFR search API into the
//! local store.

pub mod ingest;
pub mod source;

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
mod retry;

pub use ingest::{IngestError, IngestOptions, IngestStats, PAGE_DELAY, run_ingest};
pub use source::{RegulationSource, SearchParams, SourceError};

#[cfg(feature = "http")]
pub use http::{EcfrClient, EcfrConfig};
#[cfg(feature = "http")]
pub use retry::RetryPolicy;
