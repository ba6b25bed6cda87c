use std::path::{Path, PathBuf};

use clap::Subcommand;
use ns_core::{Error, Result};
use serde::Serialize;
use tokio::fs;
use tracing::{error, info};

use crate::assembler::{first_by_slug, series_entry, ContentAssembler};

#[derive(Subcommand, Debug, Clone)]
pub enum ContentCommands {
    /// List configured series with their published article counts
    Series,
    /// Print the published articles of a series as JSON
    Articles {
        /// Series slug as configured in site.config.yaml
        series: String,
    },
    /// Print one article with its localized block tree as JSON
    Article {
        series: String,
        article: String,
    },
    /// Print every series/article path
    Paths,
    /// Rebuild the whole content tree into a directory
    Sync {
        /// Output directory for the generated JSON files
        #[arg(long, default_value = "content")]
        out: PathBuf,
    },
}

pub async fn handle_command(command: ContentCommands, assembler: &ContentAssembler) -> Result<()> {
    match command {
        ContentCommands::Series => {
            for series in assembler.list_series().await {
                println!("{}\t{}\t{} articles", series.slug, series.name, series.article_count);
            }
        }
        ContentCommands::Articles { series } => {
            if assembler.config().find_database(&series).is_none() {
                return Err(Error::NotFound(format!("series {}", series)));
            }
            print_json(&assembler.list_articles(&series).await)?;
        }
        ContentCommands::Article { series, article } => {
            match assembler.get_article(&series, &article).await? {
                Some(content) => print_json(&content)?,
                None => {
                    return Err(Error::NotFound(format!("article {}/{}", series, article)));
                }
            }
        }
        ContentCommands::Paths => {
            for path in assembler.list_article_paths().await {
                println!("{}/{}", path.series_slug, path.article_slug);
            }
        }
        ContentCommands::Sync { out } => sync(assembler, &out).await?,
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?).await?;
    Ok(())
}

/// Writes `series.json`, `{series}/index.json` and `{series}/{article}.json`.
///
/// A failing article is logged and skipped; any failure is reported as an
/// error once everything else has been written.
pub async fn sync(assembler: &ContentAssembler, out: &Path) -> Result<()> {
    info!("🔄 Syncing content into {}", out.display());
    let mut series_list = Vec::new();
    let mut written = 0usize;
    let mut failed = Vec::new();

    for db in &assembler.config().notion.databases {
        let articles = assembler.list_articles(&db.slug).await;
        series_list.push(series_entry(db, articles.len()));
        write_json(&out.join(&db.slug).join("index.json"), &articles).await?;

        for article in first_by_slug(&db.slug, articles) {
            let slug = article.slug.clone();
            match assembler.assemble_article(db, article).await {
                Ok(content) => {
                    write_json(&out.join(&db.slug).join(format!("{}.json", slug)), &content).await?;
                    written += 1;
                }
                Err(e) => {
                    error!("❌ Failed to build {}/{}: {}", db.slug, slug, e);
                    failed.push(format!("{}/{}", db.slug, slug));
                }
            }
        }
    }

    write_json(&out.join("series.json"), &series_list).await?;
    info!("✨ Wrote {} articles across {} series", written, series_list.len());

    if !failed.is_empty() {
        return Err(Error::External(anyhow::anyhow!(
            "{} article(s) failed: {}",
            failed.len(),
            failed.join(", ")
        )));
    }
    Ok(())
}
