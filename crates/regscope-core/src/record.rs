//! The regulation record shared by the store, the ingestion pipeline and the
//! query layer.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Nested locating metadata (`hierarchy`, `hierarchy_headings`, `headings`).
///
/// Persisted as a JSON object in a text column; `{}` when the source omits it.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One regulation excerpt.
///
/// Records pulled straight from the live source carry no `id` and no
/// `last_updated`; the store assigns both on write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Regulation {
    pub id: Option<i64>,
    /// CFR title number, e.g. "12".
    pub title: Option<String>,
    pub part: Option<String>,
    pub section: Option<String>,
    /// Excerpt body (`full_text_excerpt` upstream).
    pub full_text: String,
    pub starts_on: Option<NaiveDate>,
    /// `None` means the excerpt is currently in force.
    pub ends_on: Option<NaiveDate>,
    #[serde(default)]
    pub hierarchy: Metadata,
    #[serde(default)]
    pub hierarchy_headings: Metadata,
    #[serde(default)]
    pub headings: Metadata,
    /// UTC time of the local write.
    pub last_updated: Option<NaiveDateTime>,
}

impl Regulation {
    /// Whether the excerpt has no end date.
    pub fn is_active(&self) -> bool {
        self.ends_on.is_none()
    }

    /// Whether the excerpt has an end date.
    pub fn is_ended(&self) -> bool {
        self.ends_on.is_some()
    }

    /// Short human label such as `12 CFR 1026 § 1026.5`.
    pub fn citation(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
            out.push_str(" CFR");
        }
        if let Some(part) = &self.part {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(part);
        }
        if let Some(section) = &self.section {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("§ ");
            out.push_str(section);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_and_ended_are_exclusive() {
        let active = Regulation::default();
        assert!(active.is_active());
        assert!(!active.is_ended());

        let ended = Regulation {
            ends_on: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..Default::default()
        };
        assert!(ended.is_ended());
        assert!(!ended.is_active());
    }

    #[test]
    fn citation_formats_available_parts() {
        let reg = Regulation {
            title: Some("12".into()),
            part: Some("1026".into()),
            section: Some("1026.5".into()),
            ..Default::default()
        };
        assert_eq!(reg.citation(), "12 CFR 1026 § 1026.5");

        let part_only = Regulation {
            part: Some("1026".into()),
            ..Default::default()
        };
        assert_eq!(part_only.citation(), "1026");
        assert_eq!(Regulation::default().citation(), "");
    }

    #[test]
    fn missing_metadata_deserializes_empty() {
        let json = r#"{
            "id": null,
            "title": "40",
            "part": "60",
            "section": null,
            "full_text": "Standards of performance",
            "starts_on": "2019-07-01",
            "ends_on": null,
            "last_updated": null
        }"#;
        let reg: Regulation = serde_json::from_str(json).unwrap();
        assert!(reg.hierarchy.is_empty());
        assert!(reg.headings.is_empty());
        assert_eq!(reg.starts_on, NaiveDate::from_ymd_opt(2019, 7, 1));
    }
}
