//! In-memory stand-ins for the Notion API and the asset host.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use ns_core::{ApiGeneration, AssetFetcher, DatabaseQuery, Error, NotionApi, PaginatedList, PropertySchema, Result};
use serde_json::{json, Value};

fn not_found(id: &str) -> Error {
    Error::Api {
        status: 404,
        code: "object_not_found".to_string(),
        message: format!("Could not find {}", id),
    }
}

/// Serves canned pages. Page `n` of an id is reached with cursor `"{id}#{n}"`.
pub struct MockNotionApi {
    generation: ApiGeneration,
    schema: PropertySchema,
    databases: HashMap<String, Vec<Vec<Value>>>,
    children: HashMap<String, Vec<Vec<Value>>>,
    failing_pages: HashSet<(String, usize)>,
    queries: Mutex<Vec<DatabaseQuery>>,
    database_calls: Mutex<Vec<String>>,
    children_calls: Mutex<Vec<String>>,
}

impl MockNotionApi {
    pub fn new(generation: ApiGeneration) -> Self {
        Self {
            generation,
            schema: generation.default_schema(),
            databases: HashMap::new(),
            children: HashMap::new(),
            failing_pages: HashSet::new(),
            queries: Mutex::new(Vec::new()),
            database_calls: Mutex::new(Vec::new()),
            children_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_database(mut self, id: &str, pages: Vec<Vec<Value>>) -> Self {
        self.databases.insert(id.to_string(), pages);
        self
    }

    pub fn with_children(mut self, id: &str, pages: Vec<Vec<Value>>) -> Self {
        self.children.insert(id.to_string(), pages);
        self
    }

    pub fn failing_database_page(mut self, id: &str, page: usize) -> Self {
        self.failing_pages.insert((id.to_string(), page));
        self
    }

    pub fn queries(&self) -> Vec<DatabaseQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn database_calls(&self) -> Vec<String> {
        self.database_calls.lock().unwrap().clone()
    }

    pub fn children_calls(&self) -> Vec<String> {
        self.children_calls.lock().unwrap().clone()
    }

    fn page(&self, source: &HashMap<String, Vec<Vec<Value>>>, id: &str, cursor: Option<&str>) -> Result<PaginatedList> {
        let pages = source.get(id).ok_or_else(|| not_found(id))?;
        let index = match cursor {
            None => 0,
            Some(cursor) => cursor
                .strip_prefix(&format!("{}#", id))
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| Error::Api {
                    status: 400,
                    code: "validation_error".to_string(),
                    message: format!("bad cursor {}", cursor),
                })?,
        };
        if self.failing_pages.contains(&(id.to_string(), index)) {
            return Err(Error::Api {
                status: 502,
                code: "service_unavailable".to_string(),
                message: "upstream hiccup".to_string(),
            });
        }

        let results = pages.get(index).cloned().unwrap_or_default();
        let has_more = index + 1 < pages.len();
        Ok(PaginatedList {
            results,
            has_more,
            next_cursor: has_more.then(|| format!("{}#{}", id, index + 1)),
        })
    }
}

#[async_trait]
impl NotionApi for MockNotionApi {
    fn generation(&self) -> ApiGeneration {
        self.generation
    }

    fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    async fn query_database(&self, database_id: &str, query: &DatabaseQuery) -> Result<PaginatedList> {
        self.database_calls.lock().unwrap().push(database_id.to_string());
        self.queries.lock().unwrap().push(query.clone());
        self.page(&self.databases, database_id, query.start_cursor.as_deref())
    }

    async fn list_block_children(&self, block_id: &str, start_cursor: Option<&str>) -> Result<PaginatedList> {
        self.children_calls.lock().unwrap().push(block_id.to_string());
        self.page(&self.children, block_id, start_cursor)
    }
}

#[derive(Default)]
pub struct StubAssets {
    bodies: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl StubAssets {
    pub fn serving(mut self, url: &str, bytes: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), bytes.to_vec());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetFetcher for StubAssets {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        self.bodies.get(url).cloned().ok_or_else(|| Error::UnexpectedStatus {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// A published page in the current-generation shape.
pub fn page_fixture(id: &str, title: &str, slug: &str, date: &str) -> Value {
    json!({
        "object": "page",
        "id": id,
        "created_time": "2026-01-01T00:00:00.000Z",
        "cover": null,
        "properties": {
            "Title": { "type": "title", "title": [{ "type": "text", "text": { "content": title }, "plain_text": title }] },
            "Slug": { "type": "rich_text", "rich_text": [{ "plain_text": slug }] },
            "Description": { "type": "rich_text", "rich_text": [{ "plain_text": format!("About {}", title) }] },
            "Tags": { "type": "multi_select", "multi_select": [{ "name": "typescript" }] },
            "PublishedDate": { "type": "date", "date": { "start": date } },
            "Status": { "type": "select", "select": { "name": "Published" } }
        }
    })
}

pub fn block_fixture(id: &str, block_type: &str, has_children: bool) -> Value {
    let mut block = json!({
        "object": "block",
        "id": id,
        "type": block_type,
        "has_children": has_children,
    });
    block[block_type] = json!({ "rich_text": [{ "plain_text": id, "text": { "content": id } }] });
    block
}

pub fn image_block_fixture(id: &str, url: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "image",
        "has_children": false,
        "image": { "type": "file", "caption": [], "file": { "url": url, "expiry_time": "2026-01-01T01:00:00.000Z" } }
    })
}
