use regscope_store::StoreError;
use regscope_sync::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Bad user input; the message is meant to be shown as-is.
    #[error("{0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("search task failed: {0}")]
    Task(String),
}
