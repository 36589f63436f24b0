//! Tone layer: sentiment scoring and the STRICT/NEUTRAL/PERMISSIVE
//! classification applied to every search result.
//!
//! [`VaderScorer`] is the default. [`LexiconScorer`] scores against a
//! lexicon file supplied at startup instead.

mod lexicon;
mod tone;
mod vader;

pub use lexicon::{LexiconError, LexiconScorer};
pub use tone::{PERMISSIVE_ABOVE, STRICT_BELOW, SentimentScorer, Tone, ToneCounts};
pub use vader::VaderScorer;
