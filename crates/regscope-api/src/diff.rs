//! Line diffs between two versions of a regulation part.

use similar::TextDiff;

/// Lines of unchanged context around each hunk.
const CONTEXT_LINES: usize = 3;

/// Unified diff of `old` → `new`, headed `--- old_label` / `+++ new_label`.
/// Identical inputs produce an empty string.
pub fn unified_diff(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(old_label, new_label)
        .to_string()
}
