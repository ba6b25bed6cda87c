use std::path::Path;

use md5::{Digest, Md5};
use ns_core::{Block, Error, ImageMap, Result};
use tracing::warn;
use url::Url;

/// Public URL prefix of every localized image; also its location under the public dir.
pub const IMAGE_ROOT: &str = "/images/notion";

const HASH_LEN: usize = 12;
const DEFAULT_EXTENSION: &str = ".png";

/// Deterministic local path for a remote image.
///
/// Only origin and path are hashed. Notion re-signs hosted file URLs on every
/// request, so the query string must not influence the result.
pub fn local_image_path(url: &str, series_slug: &str, article_slug: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    let base = format!("{}{}", parsed.origin().ascii_serialization(), parsed.path());

    let digest = format!("{:x}", Md5::digest(base.as_bytes()));
    let hash = &digest[..HASH_LEN];

    let ext = Path::new(parsed.path())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    Ok(format!("{}/{}/{}/{}{}", IMAGE_ROOT, series_slug, article_slug, hash, ext))
}

/// Returns a rewritten copy of `blocks` where every image points at its local
/// path, together with the remote-to-local map of everything rewritten.
pub fn localize_media(blocks: &[Block], series_slug: &str, article_slug: &str) -> (Vec<Block>, ImageMap) {
    let mut localizer = Localizer {
        series_slug,
        article_slug,
        image_map: ImageMap::new(),
    };
    let localized = localizer.blocks(blocks);
    (localized, localizer.image_map)
}

struct Localizer<'a> {
    series_slug: &'a str,
    article_slug: &'a str,
    image_map: ImageMap,
}

impl Localizer<'_> {
    fn blocks(&mut self, blocks: &[Block]) -> Vec<Block> {
        blocks.iter().map(|block| self.block(block)).collect()
    }

    fn block(&mut self, block: &Block) -> Block {
        let mut localized = Block {
            id: block.id.clone(),
            block_type: block.block_type.clone(),
            has_children: block.has_children,
            children: None,
            payload: block.payload.clone(),
        };

        if let Some(url) = block.image_url() {
            match local_image_path(url, self.series_slug, self.article_slug) {
                Ok(local_path) => {
                    localized.set_image_url(&local_path);
                    self.image_map.insert(url.to_string(), local_path);
                }
                Err(e) => warn!("⚠️ Leaving image of block {} remote: {}", block.id, e),
            }
        }

        localized.children = block.children.as_deref().map(|children| self.blocks(children));
        localized
    }
}
