use std::collections::HashSet;
use std::sync::Arc;

use ns_core::logging::Logger;
use ns_core::{
    Article, ArticlePath, ArticleWithContent, AssetFetcher, Error, NotionApi, NotionDatabase, Result, Series,
    SiteConfig,
};
use ns_media::{localize_media, materialize_media, MediaDirs};
use tracing::{debug, info, warn};

use crate::fetcher::{fetch_block_tree, fetch_database_entries};

/// Turns configured databases into series, article lists and renderable articles.
///
/// Without a Notion connection it runs offline: series are listed from the
/// configuration with zero articles and no request is ever made.
pub struct ContentAssembler {
    config: Arc<SiteConfig>,
    api: Option<Arc<dyn NotionApi>>,
    assets: Arc<dyn AssetFetcher>,
    media: MediaDirs,
}

impl ContentAssembler {
    pub fn new(
        config: Arc<SiteConfig>,
        api: Option<Arc<dyn NotionApi>>,
        assets: Arc<dyn AssetFetcher>,
        media: MediaDirs,
    ) -> Self {
        if api.is_none() {
            warn!("⚠️ No Notion credential configured, running offline with empty content");
        }
        Self {
            config,
            api,
            assets,
            media,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.api.is_none()
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn media(&self) -> &MediaDirs {
        &self.media
    }

    /// Every configured database, in configuration order.
    pub async fn list_series(&self) -> Vec<Series> {
        let mut series = Vec::with_capacity(self.config.notion.databases.len());
        for db in &self.config.notion.databases {
            let count = match &self.api {
                Some(api) => fetch_database_entries(api.as_ref(), &db.id).await.len(),
                None => 0,
            };
            series.push(series_entry(db, count));
        }
        series
    }

    /// Published articles of one series; empty for unknown slugs or offline.
    pub async fn list_articles(&self, series_slug: &str) -> Vec<Article> {
        let Some(api) = &self.api else {
            return Vec::new();
        };
        let Some(db) = self.config.find_database(series_slug) else {
            debug!("Unknown series: {}", series_slug);
            return Vec::new();
        };
        fetch_database_entries(api.as_ref(), &db.id).await
    }

    /// One article with its localized block tree.
    ///
    /// `Ok(None)` when the series is unknown, the slug does not match any
    /// published article, or the assembler is offline. Block fetch errors are
    /// returned; media download problems only show up in the log.
    pub async fn get_article(&self, series_slug: &str, article_slug: &str) -> Result<Option<ArticleWithContent>> {
        if self.api.is_none() {
            return Ok(None);
        }
        let Some(db) = self.config.find_database(series_slug) else {
            return Ok(None);
        };

        let articles = self.list_articles(series_slug).await;
        let Some(article) = articles.into_iter().find(|a| a.slug == article_slug) else {
            return Ok(None);
        };

        self.assemble_article(db, article).await.map(Some)
    }

    /// Fetches, localizes and materializes the content of an already listed article.
    ///
    /// Fails with [`Error::Offline`] when there is no Notion connection.
    pub async fn assemble_article(&self, db: &NotionDatabase, article: Article) -> Result<ArticleWithContent> {
        let Some(api) = &self.api else {
            return Err(Error::Offline);
        };
        let logger = Logger::new().with_prefix(format!("[{}/{}]", db.slug, article.slug));

        let blocks = fetch_block_tree(api.as_ref(), &article.id).await?;
        let (blocks, image_map) = localize_media(&blocks, &db.slug, &article.slug);

        if !image_map.is_empty() {
            let report = materialize_media(self.assets.as_ref(), &image_map, &self.media, &logger).await;
            logger.debug(&format!(
                "🖼️ {} downloaded, {} cached, {} copied, {} failed",
                report.downloaded, report.cached, report.copied, report.failed
            ));
        }
        logger.info(&format!("📄 {} blocks, {} images", blocks.len(), image_map.len()));

        Ok(ArticleWithContent {
            article,
            blocks,
            series_slug: db.slug.clone(),
            series_name: db.name.clone(),
        })
    }

    /// Every `(series, article)` slug pair, for static path generation.
    pub async fn list_article_paths(&self) -> Vec<ArticlePath> {
        let mut paths = Vec::new();
        for db in &self.config.notion.databases {
            for article in first_by_slug(&db.slug, self.list_articles(&db.slug).await) {
                paths.push(ArticlePath {
                    series_slug: db.slug.clone(),
                    article_slug: article.slug,
                });
            }
        }
        info!("✨ {} article paths across {} series", paths.len(), self.config.notion.databases.len());
        paths
    }
}

/// Keeps the first article per slug, the one `get_article` resolves to.
pub fn first_by_slug(series_slug: &str, articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|article| {
            let fresh = seen.insert(article.slug.clone());
            if !fresh {
                warn!(
                    "⚠️ Duplicate slug {}/{}: skipping page {}",
                    series_slug, article.slug, article.id
                );
            }
            fresh
        })
        .collect()
}

pub fn series_entry(db: &NotionDatabase, article_count: usize) -> Series {
    Series {
        id: db.id.clone(),
        name: db.name.clone(),
        slug: db.slug.clone(),
        description: db.description.clone(),
        article_count,
    }
}
