//! Normalizes Notion page payloads into [`Article`]s.
//!
//! The two API generations name their properties differently and a property
//! may arrive with or without its `type` tag, so every value is classified by
//! [`PropertyValue::detect`] before anything reads it.

use chrono::{DateTime, NaiveDate};
use ns_core::{Article, PropertySchema};
use serde_json::Value;

pub const UNTITLED: &str = "Untitled";

const KINDS: [&str; 10] = [
    "title",
    "rich_text",
    "select",
    "status",
    "multi_select",
    "date",
    "number",
    "files",
    "url",
    "formula",
];

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    Select(Option<String>),
    Status(Option<String>),
    MultiSelect(Vec<String>),
    Date(Option<String>),
    Number(Option<f64>),
    Files(Vec<String>),
    Url(Option<String>),
    Formula(Option<String>),
    Unsupported,
}

impl PropertyValue {
    pub fn detect(value: &Value) -> Self {
        let tagged = value
            .get("type")
            .and_then(Value::as_str)
            .filter(|kind| value.get(*kind).is_some());
        let kind = tagged.or_else(|| KINDS.iter().copied().find(|kind| value.get(*kind).is_some()));

        let Some(kind) = kind else {
            return PropertyValue::Unsupported;
        };
        let inner = &value[kind];

        match kind {
            "title" => PropertyValue::Title(plain_text(inner)),
            "rich_text" => PropertyValue::RichText(plain_text(inner)),
            "select" => PropertyValue::Select(option_name(inner)),
            "status" => PropertyValue::Status(option_name(inner)),
            "multi_select" => PropertyValue::MultiSelect(
                inner
                    .as_array()
                    .map(|options| options.iter().filter_map(option_name).collect())
                    .unwrap_or_default(),
            ),
            "date" => PropertyValue::Date(inner.get("start").and_then(Value::as_str).map(str::to_string)),
            "number" => PropertyValue::Number(inner.as_f64()),
            "files" => PropertyValue::Files(
                inner
                    .as_array()
                    .map(|files| files.iter().filter_map(file_url).collect())
                    .unwrap_or_default(),
            ),
            "url" => PropertyValue::Url(inner.as_str().map(str::to_string)),
            "formula" => PropertyValue::Formula(formula_text(inner)),
            _ => PropertyValue::Unsupported,
        }
    }

    /// Text content of text-like values, `None` when empty.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            PropertyValue::Title(s) | PropertyValue::RichText(s) => Some(s.clone()),
            PropertyValue::Select(s)
            | PropertyValue::Status(s)
            | PropertyValue::Url(s)
            | PropertyValue::Formula(s) => s.clone(),
            _ => None,
        };
        text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }
}

fn plain_text(spans: &Value) -> String {
    spans
        .as_array()
        .map(|spans| {
            spans
                .iter()
                .filter_map(|span| {
                    span.get("plain_text")
                        .or_else(|| span.get("text").and_then(|t| t.get("content")))
                        .and_then(Value::as_str)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn option_name(option: &Value) -> Option<String> {
    option.get("name").and_then(Value::as_str).map(str::to_string)
}

fn file_url(file: &Value) -> Option<String> {
    ["file", "external"]
        .iter()
        .find_map(|kind| file.get(*kind)?.get("url")?.as_str())
        .map(str::to_string)
}

fn formula_text(formula: &Value) -> Option<String> {
    match formula.get("type").and_then(Value::as_str) {
        Some("string") => formula.get("string").and_then(Value::as_str).map(str::to_string),
        Some("number") => formula.get("number").and_then(Value::as_f64).map(|n| n.to_string()),
        _ => formula.get("string").and_then(Value::as_str).map(str::to_string),
    }
}

/// URL-safe slug: lowercase ASCII alphanumerics, `_`, and single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// `YYYY-MM-DD` from a date or datetime string.
fn date_only(value: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    let prefix = value.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Builds an Article from one query result, `None` when the page has no id.
pub fn page_to_article(page: &Value, schema: &PropertySchema) -> Option<Article> {
    let id = page
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())?
        .to_string();
    let property = |name: &str| {
        page.get("properties")
            .and_then(|props| props.get(name))
            .map(PropertyValue::detect)
            .unwrap_or(PropertyValue::Unsupported)
    };

    let title = property(&schema.title).as_text();

    let slug = property(&schema.slug)
        .as_text()
        .map(|s| slugify(&s))
        .filter(|s| !s.is_empty())
        .or_else(|| title.as_deref().map(slugify).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| id.clone());

    let tags = match property(&schema.tags) {
        PropertyValue::MultiSelect(tags) => tags,
        PropertyValue::Select(Some(tag)) => vec![tag],
        _ => Vec::new(),
    };

    let published_date = match property(&schema.published_date) {
        PropertyValue::Date(Some(start)) => date_only(&start),
        _ => None,
    }
    .or_else(|| {
        page.get("created_time")
            .and_then(Value::as_str)
            .and_then(date_only)
    })
    .unwrap_or_default();

    let order = match property(&schema.order) {
        PropertyValue::Number(n) => n,
        _ => None,
    };

    let cover = match property(&schema.cover) {
        PropertyValue::Files(urls) => urls.into_iter().next(),
        PropertyValue::Url(url) => url,
        _ => None,
    }
    .or_else(|| page.get("cover").and_then(file_url));

    Some(Article {
        id,
        title: title.unwrap_or_else(|| UNTITLED.to_string()),
        slug,
        description: property(&schema.description).as_text().unwrap_or_default(),
        tags,
        published_date,
        order,
        cover,
    })
}
