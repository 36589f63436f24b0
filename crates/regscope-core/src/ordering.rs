//! Client-side shaping of live search results.
//!
//! The live source can return the same excerpt more than once (one hit per
//! matching paragraph). Results are collapsed on `(section, trimmed excerpt)`
//! and then ordered by the key `ends_on.is_none()`.
//!
//! # Ordering note
//!
//! `false < true`, so records *with* an end date sort first and currently
//! active records come last. This is likely an inverted key, but it is the
//! behaviour consumers of the live view have seen, so it stays until someone
//! decides otherwise.

use std::collections::HashSet;

use crate::record::Regulation;

/// Drop every result whose `(section, trimmed full_text)` was already seen,
/// keeping the first occurrence and the original relative order.
pub fn dedupe_by_section_excerpt(results: Vec<Regulation>) -> Vec<Regulation> {
    let mut seen: HashSet<(Option<String>, String)> = HashSet::with_capacity(results.len());
    results
        .into_iter()
        .filter(|r| seen.insert((r.section.clone(), r.full_text.trim().to_string())))
        .collect()
}

/// Stable sort on `ends_on.is_none()`: ended records first, active last.
pub fn sort_ended_first(results: &mut [Regulation]) {
    results.sort_by_key(|r| r.ends_on.is_none());
}
