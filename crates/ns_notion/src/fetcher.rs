use futures::future::{BoxFuture, FutureExt};
use ns_core::{Article, Block, DatabaseQuery, NotionApi, Result};
use tracing::{debug, warn};

use crate::adapter::page_to_article;

/// Published articles of one database, newest first.
///
/// Never fails: any error is logged and yields an empty list for this
/// database only.
pub async fn fetch_database_entries(api: &dyn NotionApi, database_id: &str) -> Vec<Article> {
    match query_all_pages(api, database_id).await {
        Ok(articles) => articles,
        Err(e) => {
            warn!("⚠️ Failed to fetch database {}: {}", database_id, e);
            Vec::new()
        }
    }
}

async fn query_all_pages(api: &dyn NotionApi, database_id: &str) -> Result<Vec<Article>> {
    let schema = api.schema();
    let query = DatabaseQuery::published(schema);
    let mut articles = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = api
            .query_database(database_id, &query.clone().with_cursor(cursor.take()))
            .await?;

        for result in &page.results {
            match page_to_article(result, schema) {
                Some(article) => articles.push(article),
                None => warn!("⚠️ Skipping entry without id in database {}", database_id),
            }
        }

        match page.continuation() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    debug!("📚 Database {} has {} published entries", database_id, articles.len());
    Ok(articles)
}

/// Immediate children of `parent_id`, all pages, in API order.
async fn list_all_children(api: &dyn NotionApi, parent_id: &str) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = api.list_block_children(parent_id, cursor.as_deref()).await?;
        for result in page.results {
            blocks.push(serde_json::from_value::<Block>(result)?);
        }

        match page.next_cursor.filter(|_| page.has_more) {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(blocks)
}

/// Full block tree under a page or block.
///
/// Siblings are listed first, then each child with `has_children` is descended
/// into in document order. Any failure fails the whole tree.
pub fn fetch_block_tree<'a>(api: &'a dyn NotionApi, root_id: &'a str) -> BoxFuture<'a, Result<Vec<Block>>> {
    async move {
        let mut blocks = list_all_children(api, root_id).await?;
        for block in blocks.iter_mut().filter(|b| b.has_children) {
            let id = block.id.clone();
            block.children = Some(fetch_block_tree(api, &id).await?);
        }
        Ok(blocks)
    }
    .boxed()
}
