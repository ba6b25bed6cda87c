use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{ApiGeneration, PropertySchema};
use crate::Result;

pub const PAGE_SIZE: u32 = 100;

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginatedList {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl PaginatedList {
    /// Cursor for the following page, `None` once the listing is exhausted.
    pub fn continuation(&self) -> Option<&str> {
        if self.has_more {
            self.next_cursor.as_deref()
        } else {
            None
        }
    }
}

/// Body of a database (or data source) query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseQuery {
    pub filter: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    pub page_size: u32,
}

impl DatabaseQuery {
    /// Published entries only, newest first.
    pub fn published(schema: &PropertySchema) -> Self {
        let mut filter = json!({ "property": schema.status });
        filter[schema.status_kind.filter_key()] = json!({ "equals": schema.published_value });

        Self {
            filter,
            sorts: vec![json!({ "property": schema.published_date, "direction": "descending" })],
            start_cursor: None,
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.start_cursor = cursor;
        self
    }
}

/// Read access to the Notion API.
#[async_trait]
pub trait NotionApi: Send + Sync {
    /// The API generation this connection talks to
    fn generation(&self) -> ApiGeneration;

    /// Property names used to filter, sort and read database entries
    fn schema(&self) -> &PropertySchema;

    /// Returns one page of entries of a database
    async fn query_database(&self, database_id: &str, query: &DatabaseQuery) -> Result<PaginatedList>;

    /// Returns one page of the immediate children of a page or block
    async fn list_block_children(&self, block_id: &str, start_cursor: Option<&str>) -> Result<PaginatedList>;
}

/// Fetches the bytes behind a media URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
