use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::richtext::RichTextSpan;

/// Remote URL to localized path, keyed by the URL exactly as it appeared in
/// the block. Iterates in insertion order, i.e. document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMap {
    entries: Vec<(String, String)>,
}

impl ImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mapping unless the URL is already present. Returns whether it was added.
    pub fn insert(&mut self, remote_url: impl Into<String>, local_path: impl Into<String>) -> bool {
        let remote_url = remote_url.into();
        if self.get(&remote_url).is_some() {
            return false;
        }
        self.entries.push((remote_url, local_path.into()));
        true
    }

    pub fn get(&self, remote_url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(remote, _)| remote == remote_url)
            .map(|(_, local)| local.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(remote, local)| (remote.as_str(), local.as_str()))
    }
}

impl FromIterator<(String, String)> for ImageMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = ImageMap::new();
        for (remote, local) in iter {
            map.insert(remote, local);
        }
        map
    }
}

/// One published entry of a Notion database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub tags: Vec<String>,
    pub published_date: String,
    pub order: Option<f64>,
    pub cover: Option<String>,
}

/// A configured database together with the number of published articles it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub article_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleWithContent {
    pub article: Article,
    pub blocks: Vec<Block>,
    pub series_slug: String,
    pub series_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePath {
    pub series_slug: String,
    pub article_slug: String,
}

/// A node of a page's block tree.
///
/// `children` is only ever `Some` when `has_children` is set and the children
/// were fetched; everything else the API sent for the block stays in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Block {
    pub fn is_image(&self) -> bool {
        self.block_type == "image"
    }

    /// Type-specific content, e.g. the `paragraph` object of a paragraph block.
    pub fn content(&self) -> Option<&Value> {
        self.payload.get(&self.block_type)
    }

    /// URL of an image block, hosted file first, then external link.
    pub fn image_url(&self) -> Option<&str> {
        if !self.is_image() {
            return None;
        }
        let image = self.payload.get("image")?;
        ["file", "external"]
            .iter()
            .find_map(|kind| image.get(*kind)?.get("url")?.as_str())
    }

    /// Replaces the image URL in whichever of `file` / `external` carries it.
    /// Returns false when the block holds no image URL.
    pub fn set_image_url(&mut self, url: &str) -> bool {
        let Some(image) = self.payload.get_mut("image") else {
            return false;
        };
        for kind in ["file", "external"] {
            if let Some(Value::Object(target)) = image.get_mut(kind) {
                if target.get("url").and_then(Value::as_str).is_some() {
                    target.insert("url".to_string(), Value::String(url.to_string()));
                    return true;
                }
            }
        }
        false
    }

    /// Rich text of the block's own content, empty when the type has none.
    pub fn rich_text(&self) -> Vec<RichTextSpan> {
        self.content()
            .and_then(|content| content.get("rich_text"))
            .and_then(|spans| serde_json::from_value(spans.clone()).ok())
            .unwrap_or_default()
    }
}
