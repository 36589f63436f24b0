//! Storage layer: a single-file DuckDB database holding the `regulations` table.

mod decode;
mod duck;
mod error;

pub use duck::{COMMIT_BATCH_SIZE, RegulationStore, SearchPage, UpsertMode, UpsertReport};
pub use error::StoreError;
