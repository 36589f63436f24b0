//! Terminal rendering of a search report.
//!
//! A summary block, grouping counts, then one vertical card per result.

use std::collections::BTreeMap;
use std::fmt::Write;

use regscope_query::{EnrichedResult, SearchReport};

/// Excerpts longer than this are cut with an ellipsis.
const MAX_EXCERPT_CHARS: usize = 240;

// ── Public API ──

pub fn print_report(report: &SearchReport) {
    print!("{}", render_report(report));
}

pub fn render_report(report: &SearchReport) -> String {
    let mut out = String::new();
    let m = &report.metadata;

    let _ = writeln!(out, "=== Search results ({} mode) ===", m.mode.as_str());
    field(&mut out, "page", format!("{} of {}", m.current_page, m.num_pages));
    field(&mut out, "results", m.total_results);
    if let Some(total) = m.total_count {
        field(&mut out, "total matches", total);
    }
    field(&mut out, "active", m.active_count);
    field(&mut out, "ended", m.ended_count);
    out.push('\n');

    if report.results.is_empty() {
        out.push_str("No regulations matched.\n");
        return out;
    }

    print_counts(&mut out, "By title", &report.title_stats);
    print_counts(&mut out, "By part", &report.part_stats);

    let t = &report.tone_counts;
    out.push_str("Tone\n");
    field(&mut out, "strict", t.strict);
    field(&mut out, "neutral", t.neutral);
    field(&mut out, "permissive", t.permissive);
    out.push('\n');

    for result in &report.results {
        print_card(&mut out, result);
    }
    out
}

// ── Sections ──

fn print_counts(out: &mut String, header: &str, counts: &BTreeMap<String, usize>) {
    let _ = writeln!(out, "{header}");
    for (key, n) in counts {
        field(out, key, n);
    }
    out.push('\n');
}

fn print_card(out: &mut String, result: &EnrichedResult) {
    let r = &result.regulation;
    let status = if r.is_ended() { "ended" } else { "active" };
    let _ = writeln!(out, "--- {} [{status}] ---", r.citation());

    if let Some(start) = r.starts_on {
        field(out, "starts on", start);
    }
    if let Some(end) = r.ends_on {
        field(out, "ends on", end);
    }
    field(out, "tone", format!("{} ({:+.3})", result.tone, result.compound));
    field(out, "excerpt", truncate(r.full_text.trim(), MAX_EXCERPT_CHARS));
    out.push('\n');
}

fn field(out: &mut String, name: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {name:<16} {value}");
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regscope_ai::{Tone, ToneCounts};
    use regscope_core::Regulation;
    use regscope_query::{SearchMetadata, SearchMode};

    fn report(results: Vec<EnrichedResult>) -> SearchReport {
        let mut title_stats = BTreeMap::new();
        title_stats.insert("12".to_string(), results.len());
        SearchReport {
            metadata: SearchMetadata {
                total_results: results.len(),
                total_count: Some(7),
                active_count: results.len(),
                ended_count: 0,
                num_pages: 2,
                current_page: 1,
                mode: SearchMode::Local,
            },
            results,
            title_stats,
            part_stats: BTreeMap::new(),
            tone_counts: ToneCounts::default(),
        }
    }

    #[test]
    fn renders_summary_and_cards() {
        let result = EnrichedResult {
            regulation: Regulation {
                title: Some("12".into()),
                part: Some("1026".into()),
                section: Some("1026.5".into()),
                full_text: "  Creditors shall disclose  ".into(),
                ..Default::default()
            },
            tone: Tone::Strict,
            compound: -0.4,
        };
        let text = render_report(&report(vec![result]));

        assert!(text.starts_with("=== Search results (local mode) ==="));
        assert!(text.contains("page             1 of 2"));
        assert!(text.contains("total matches    7"));
        assert!(text.contains("--- 12 CFR 1026 § 1026.5 [active] ---"));
        assert!(text.contains("tone             STRICT (-0.400)"));
        assert!(text.contains("excerpt          Creditors shall disclose\n"));
    }

    #[test]
    fn empty_report_says_so() {
        let text = render_report(&report(vec![]));
        assert!(text.contains("No regulations matched."));
        assert!(!text.contains("By title"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("§§§§", 2), "§§…");
    }
}
