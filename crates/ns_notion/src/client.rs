use std::fmt;

use async_trait::async_trait;
use ns_core::config::NotionConfig;
use ns_core::{ApiGeneration, DatabaseQuery, Error, NotionApi, PaginatedList, PropertySchema, Result};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const API_KEY_ENV: &str = "NOTION_API_KEY";

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

pub struct NotionHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    generation: ApiGeneration,
    schema: PropertySchema,
}

impl fmt::Debug for NotionHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionHttpClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("generation", &self.generation)
            .finish()
    }
}

impl NotionHttpClient {
    pub fn new(api_key: impl Into<String>, generation: ApiGeneration, schema: PropertySchema) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: NOTION_API_BASE.to_string(),
            generation,
            schema,
        }
    }

    pub fn from_config(api_key: impl Into<String>, config: &NotionConfig) -> Self {
        Self::new(api_key, config.api, config.schema())
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<PaginatedList> {
        let response = request
            .bearer_auth(&self.api_key)
            .header("Notion-Version", self.generation.notion_version())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(err) => (err.code, err.message),
                Err(_) => (String::new(), body),
            };
            return Err(Error::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(response.json::<PaginatedList>().await?)
    }
}

#[async_trait]
impl NotionApi for NotionHttpClient {
    fn generation(&self) -> ApiGeneration {
        self.generation
    }

    fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    async fn query_database(&self, database_id: &str, query: &DatabaseQuery) -> Result<PaginatedList> {
        let url = self.url(&self.generation.query_path(database_id));
        tracing::debug!("POST {} cursor={:?}", url, query.start_cursor);
        self.send(self.client.post(url).json(query)).await
    }

    async fn list_block_children(&self, block_id: &str, start_cursor: Option<&str>) -> Result<PaginatedList> {
        let url = self.url(&format!("blocks/{}/children", block_id));
        let mut params = vec![("page_size", ns_core::remote::PAGE_SIZE.to_string())];
        if let Some(cursor) = start_cursor {
            params.push(("start_cursor", cursor.to_string()));
        }
        tracing::debug!("GET {} cursor={:?}", url, start_cursor);
        self.send(self.client.get(url).query(&params)).await
    }
}
