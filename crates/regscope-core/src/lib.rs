pub mod ordering;
pub mod record;
pub mod source;

pub use ordering::{dedupe_by_section_excerpt, sort_ended_first};
pub use record::{Metadata, Regulation};
pub use source::{NormalizeError, SourcePage, SourceResult};
