//! Wire shapes of the eCFR search API and their normalisation into
//! [`Regulation`] records.
//!
//! The search endpoint has shipped two response layouts: `meta.total_pages`
//! and a top-level `total_pages`. Both deserialize into [`SourcePage`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::record::{Metadata, Regulation};

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("invalid {field} date: {value:?}")]
    InvalidDate { field: &'static str, value: String },
    #[error("{field}: expected {expected}, got {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("result is {0}, not an object")]
    NotAnObject(&'static str),
}

/// One item of the `results` array as returned by the source.
///
/// Every field is kept as raw JSON so that one badly typed item never fails
/// the page it arrived on; type checks happen in [`normalize`](Self::normalize)
/// and reject only that item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct SourceResult {
    pub title: Option<Value>,
    pub part: Option<Value>,
    pub section: Option<Value>,
    pub full_text_excerpt: Option<Value>,
    pub starts_on: Option<Value>,
    pub ends_on: Option<Value>,
    pub hierarchy: Option<Value>,
    pub hierarchy_headings: Option<Value>,
    pub headings: Option<Value>,
    /// JSON kind of an item that was not an object at all.
    #[serde(skip_serializing_if = "Option::is_none", skip_deserializing)]
    pub not_an_object: Option<&'static str>,
}

impl From<Value> for SourceResult {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self {
                not_an_object: Some(kind(&value)),
                ..Default::default()
            };
        };
        let mut take = |key: &str| map.remove(key).filter(|v| !v.is_null());
        Self {
            title: take("title"),
            part: take("part"),
            section: take("section"),
            full_text_excerpt: take("full_text_excerpt"),
            starts_on: take("starts_on"),
            ends_on: take("ends_on"),
            hierarchy: take("hierarchy"),
            hierarchy_headings: take("hierarchy_headings"),
            headings: take("headings"),
            not_an_object: None,
        }
    }
}

impl SourceResult {
    /// Convert into a storable record.
    ///
    /// Missing `title`/`part`/`section` fall back to the matching key in
    /// `hierarchy`. Dates must be `YYYY-MM-DD` strings; an empty string counts
    /// as null. Metadata fields must be objects and the excerpt a string.
    pub fn normalize(&self) -> Result<Regulation, NormalizeError> {
        if let Some(found) = self.not_an_object {
            return Err(NormalizeError::NotAnObject(found));
        }
        let hierarchy = metadata("hierarchy", self.hierarchy.as_ref())?;
        let ident = |top: &Option<Value>, key: &str| {
            top.as_ref()
                .and_then(identifier)
                .or_else(|| hierarchy.get(key).and_then(identifier))
        };

        Ok(Regulation {
            id: None,
            title: ident(&self.title, "title"),
            part: ident(&self.part, "part"),
            section: ident(&self.section, "section"),
            full_text: text("full_text_excerpt", self.full_text_excerpt.as_ref())?
                .unwrap_or_default(),
            starts_on: parse_date("starts_on", self.starts_on.as_ref())?,
            ends_on: parse_date("ends_on", self.ends_on.as_ref())?,
            hierarchy_headings: metadata("hierarchy_headings", self.hierarchy_headings.as_ref())?,
            headings: metadata("headings", self.headings.as_ref())?,
            hierarchy,
            last_updated: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    results: Vec<SourceResult>,
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(default)]
    total_pages: Option<u32>,
}

/// One page of search results with the page count the source declared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawPage")]
pub struct SourcePage {
    pub results: Vec<SourceResult>,
    pub total_pages: u32,
}

impl From<RawPage> for SourcePage {
    fn from(raw: RawPage) -> Self {
        let declared = raw
            .meta
            .and_then(|m| m.total_pages)
            .or(raw.total_pages);
        // No declared count: a page with results is at least one page.
        let total_pages = declared.unwrap_or(u32::from(!raw.results.is_empty()));
        Self {
            results: raw.results,
            total_pages,
        }
    }
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_date(field: &'static str, raw: Option<&Value>) -> Result<Option<NaiveDate>, NormalizeError> {
    match text(field, raw)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| NormalizeError::InvalidDate {
                field,
                value: s.to_string(),
            }),
    }
}

fn text(field: &'static str, raw: Option<&Value>) -> Result<Option<String>, NormalizeError> {
    match raw {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(NormalizeError::WrongType {
            field,
            expected: "a string",
            found: kind(other),
        }),
    }
}

fn metadata(field: &'static str, raw: Option<&Value>) -> Result<Metadata, NormalizeError> {
    match raw {
        None => Ok(Metadata::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(NormalizeError::WrongType {
            field,
            expected: "an object",
            found: kind(other),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
