use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ns_core::config::DEFAULT_CONFIG_FILE;
use ns_core::logging::init_logging;
use ns_core::{ApiGeneration, NotionApi, Result, SiteConfig};
use ns_media::{HttpAssetFetcher, MediaDirs};
use ns_notion::{handle_command, ContentAssembler, ContentCommands, NotionHttpClient, API_KEY_ENV};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pulls published Notion content into a static site", long_about = None)]
pub struct Cli {
    /// Site configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Directory localized images are cached in
    #[arg(long, default_value = "public")]
    public_dir: PathBuf,
    /// Also write new images here (set when static assets were already copied)
    #[arg(long)]
    dist_dir: Option<PathBuf>,
    /// Notion API generation, overrides the configuration (legacy | current)
    #[arg(long)]
    api: Option<ApiGeneration>,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: ContentCommands,
}

fn notion_client(config: &SiteConfig) -> Option<Arc<dyn NotionApi>> {
    let api_key = std::env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty())?;
    info!("🔑 Using Notion {} API", config.notion.api);
    Some(Arc::new(NotionHttpClient::from_config(api_key, &config.notion)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = SiteConfig::load(&cli.config)?;
    if let Some(api) = cli.api {
        config.notion.api = api;
    }
    info!(
        "📒 Loaded {} ({} series)",
        cli.config.display(),
        config.notion.databases.len()
    );

    let api = notion_client(&config);
    let mut media = MediaDirs::new(cli.public_dir);
    if let Some(dist_dir) = cli.dist_dir {
        media = media.with_dist_dir(dist_dir);
    }

    let assembler = ContentAssembler::new(Arc::new(config), api, Arc::new(HttpAssetFetcher::new()), media);
    handle_command(cli.command, &assembler).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_globals() {
        let cli = Cli::try_parse_from([
            "ns",
            "--api",
            "legacy",
            "--dist-dir",
            "dist",
            "-v",
            "article",
            "flutter-notes",
            "first-post",
        ])
        .unwrap();

        assert_eq!(cli.api, Some(ApiGeneration::Legacy));
        assert_eq!(cli.config, PathBuf::from("site.config.yaml"));
        assert_eq!(cli.public_dir, PathBuf::from("public"));
        assert_eq!(cli.dist_dir, Some(PathBuf::from("dist")));
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            ContentCommands::Article { ref series, ref article } if series == "flutter-notes" && article == "first-post"
        ));
    }

    #[test]
    fn test_sync_out_and_bad_generation() {
        let cli = Cli::try_parse_from(["ns", "sync", "--out", "site/content"]).unwrap();
        assert!(matches!(cli.command, ContentCommands::Sync { ref out } if out == &PathBuf::from("site/content")));

        assert!(Cli::try_parse_from(["ns", "--api", "v3", "paths"]).is_err());
    }
}
