use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("metadata json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pagination: page={page} per_page={per_page} (both must be >= 1)")]
    InvalidPagination { page: u32, per_page: u32 },

    #[error("unexpected result layout: {0}")]
    Decode(String),
}
