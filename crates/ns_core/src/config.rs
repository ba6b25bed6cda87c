use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "site.config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub site: SiteMeta,
    pub author: Author,
    pub notion: NotionConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMeta {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub links: Vec<AuthorLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorLink {
    #[serde(rename = "type")]
    pub link_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub schedule: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default)]
    pub api: ApiGeneration,
    #[serde(default)]
    pub properties: PropertyOverrides,
    #[serde(default)]
    pub databases: Vec<NotionDatabase>,
}

impl NotionConfig {
    /// Property schema of the active API generation with configured overrides applied.
    pub fn schema(&self) -> PropertySchema {
        self.properties.apply(self.api.default_schema())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionDatabase {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

/// Which generation of the Notion API the databases are queried through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiGeneration {
    /// `/databases/{id}/query`, Notion-Version 2022-06-28.
    Legacy,
    /// `/data_sources/{id}/query`, Notion-Version 2025-09-03.
    #[default]
    Current,
}

impl ApiGeneration {
    pub fn notion_version(&self) -> &'static str {
        match self {
            ApiGeneration::Legacy => "2022-06-28",
            ApiGeneration::Current => "2025-09-03",
        }
    }

    pub fn query_path(&self, database_id: &str) -> String {
        match self {
            ApiGeneration::Legacy => format!("databases/{}/query", database_id),
            ApiGeneration::Current => format!("data_sources/{}/query", database_id),
        }
    }

    pub fn default_schema(&self) -> PropertySchema {
        match self {
            ApiGeneration::Legacy => PropertySchema {
                title: "Name".to_string(),
                slug: "Slug".to_string(),
                description: "Description".to_string(),
                tags: "Tags".to_string(),
                published_date: "Date".to_string(),
                status: "Status".to_string(),
                status_kind: StatusKind::Status,
                published_value: "Published".to_string(),
                order: "Order".to_string(),
                cover: "Cover".to_string(),
            },
            ApiGeneration::Current => PropertySchema {
                title: "Title".to_string(),
                slug: "Slug".to_string(),
                description: "Description".to_string(),
                tags: "Tags".to_string(),
                published_date: "PublishedDate".to_string(),
                status: "Status".to_string(),
                status_kind: StatusKind::Select,
                published_value: "Published".to_string(),
                order: "Order".to_string(),
                cover: "Cover".to_string(),
            },
        }
    }
}

impl fmt::Display for ApiGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiGeneration::Legacy => write!(f, "legacy"),
            ApiGeneration::Current => write!(f, "current"),
        }
    }
}

impl FromStr for ApiGeneration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(ApiGeneration::Legacy),
            "current" => Ok(ApiGeneration::Current),
            other => Err(format!("Unknown API generation: {} (expected legacy or current)", other)),
        }
    }
}

/// How the status property is filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Select,
    Status,
}

impl StatusKind {
    pub fn filter_key(&self) -> &'static str {
        match self {
            StatusKind::Select => "select",
            StatusKind::Status => "status",
        }
    }
}

/// Names of the database properties an Article is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub tags: String,
    pub published_date: String,
    pub status: String,
    pub status_kind: StatusKind,
    pub published_value: String,
    pub order: String,
    pub cover: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyOverrides {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub published_date: Option<String>,
    pub status: Option<String>,
    pub status_kind: Option<StatusKind>,
    pub published_value: Option<String>,
    pub order: Option<String>,
    pub cover: Option<String>,
}

impl PropertyOverrides {
    pub fn apply(&self, mut schema: PropertySchema) -> PropertySchema {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        set(&mut schema.title, &self.title);
        set(&mut schema.slug, &self.slug);
        set(&mut schema.description, &self.description);
        set(&mut schema.tags, &self.tags);
        set(&mut schema.published_date, &self.published_date);
        set(&mut schema.status, &self.status);
        set(&mut schema.published_value, &self.published_value);
        set(&mut schema.order, &self.order);
        set(&mut schema.cover, &self.cover);
        if let Some(kind) = self.status_kind {
            schema.status_kind = kind;
        }
        schema
    }
}

fn is_url_safe(slug: &str) -> bool {
    slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: SiteConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for db in &self.notion.databases {
            if db.id.trim().is_empty() {
                return Err(Error::Config(format!("Database '{}' has an empty id", db.name)));
            }
            if db.slug.trim().is_empty() {
                return Err(Error::Config(format!("Database '{}' has an empty slug", db.name)));
            }
            if !is_url_safe(&db.slug) {
                return Err(Error::Config(format!(
                    "Series slug '{}' may only contain ASCII letters, digits, '-' and '_'",
                    db.slug
                )));
            }
            if !seen.insert(db.slug.as_str()) {
                return Err(Error::Config(format!("Duplicate series slug: {}", db.slug)));
            }
        }
        Ok(())
    }

    pub fn find_database(&self, slug: &str) -> Option<&NotionDatabase> {
        self.notion.databases.iter().find(|db| db.slug == slug)
    }
}
