use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ns_core::logging::Logger;
use ns_core::{AssetFetcher, ImageMap};
use tokio::fs;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Where localized media is materialized.
///
/// `public_dir` is the persistent cache that survives between builds. `dist_dir`
/// is only set when the site generator has already copied static assets into
/// its output before content generation runs, so new downloads must also land
/// there directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDirs {
    pub public_dir: PathBuf,
    pub dist_dir: Option<PathBuf>,
}

impl MediaDirs {
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_dir: public_dir.into(),
            dist_dir: None,
        }
    }

    pub fn with_dist_dir(mut self, dist_dir: impl Into<PathBuf>) -> Self {
        self.dist_dir = Some(dist_dir.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Fetched over the network this run
    pub downloaded: usize,
    /// Already present in the public dir
    pub cached: usize,
    /// Copied from the public dir into the dist dir
    pub copied: usize,
    pub failed: usize,
}

/// Downloads every image of `image_map` that is not cached yet, in map order.
///
/// Best effort: a failing asset is logged and counted, never returned as an
/// error. Assets are processed one at a time.
pub async fn materialize_media(
    fetcher: &dyn AssetFetcher,
    image_map: &ImageMap,
    dirs: &MediaDirs,
    logger: &Logger,
) -> DownloadReport {
    let mut report = DownloadReport::default();

    for (remote_url, local_path) in image_map.iter() {
        let Some(public_path) = resolve(&dirs.public_dir, local_path) else {
            logger.warn(&format!("⚠️ Refusing to write image outside the media root: {}", local_path));
            report.failed += 1;
            continue;
        };
        let dist_path = dirs
            .dist_dir
            .as_deref()
            .and_then(|dist| resolve(dist, local_path));

        if fs::try_exists(&public_path).await.unwrap_or(false) {
            report.cached += 1;
            if let Some(dist_path) = dist_path {
                match copy_if_missing(&public_path, &dist_path).await {
                    Ok(true) => report.copied += 1,
                    Ok(false) => {}
                    Err(e) => logger.warn(&format!(
                        "⚠️ Failed to copy {} into {}: {}",
                        local_path,
                        dist_path.display(),
                        e
                    )),
                }
            }
            continue;
        }

        let bytes = match fetcher.fetch(remote_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                logger.warn(&format!("⚠️ Failed to download image: {} ({})", remote_url, e));
                report.failed += 1;
                continue;
            }
        };

        if let Err(e) = write_atomic(&public_path, &bytes).await {
            logger.warn(&format!("⚠️ Failed to write {}: {}", public_path.display(), e));
            report.failed += 1;
            continue;
        }
        if let Some(dist_path) = dist_path {
            if let Err(e) = write_atomic(&dist_path, &bytes).await {
                logger.warn(&format!("⚠️ Failed to write {}: {}", dist_path.display(), e));
            }
        }

        logger.debug(&format!("🖼️ Downloaded {} ({} bytes)", local_path, bytes.len()));
        report.downloaded += 1;
    }

    report
}

/// Joins a `/images/...` style path onto `root`, rejecting anything that would escape it.
fn resolve(root: &Path, local_path: &str) -> Option<PathBuf> {
    let relative = Path::new(local_path.trim_start_matches('/'));
    if relative.as_os_str().is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

async fn copy_if_missing(src: &Path, dest: &Path) -> io::Result<bool> {
    if fs::try_exists(dest).await? {
        return Ok(false);
    }
    let bytes = fs::read(src).await?;
    write_atomic(dest, &bytes).await?;
    Ok(true)
}

/// Writes through a sibling temp file and a rename, so readers checking for
/// the final path never see a partially written asset.
async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = temp_sibling(path);
    let result = match fs::write(&tmp, bytes).await {
        Ok(()) => fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ns_core::{Error, Result};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubFetcher {
        responses: HashMap<String, std::result::Result<Vec<u8>, u16>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn serving(mut self, url: &str, bytes: &[u8]) -> Self {
            self.responses.insert(url.to_string(), Ok(bytes.to_vec()));
            self
        }

        fn failing(mut self, url: &str, status: u16) -> Self {
            self.responses.insert(url.to_string(), Err(status));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AssetFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(bytes)) => Ok(bytes.clone()),
                Some(Err(status)) => Err(Error::UnexpectedStatus {
                    url: url.to_string(),
                    status: *status,
                }),
                None => Err(Error::InvalidUrl(format!("no stub for {}", url))),
            }
        }
    }

    const URL_A: &str = "https://prod-files.notion.so/a.png?sig=1";
    const URL_B: &str = "https://prod-files.notion.so/b.png?sig=1";

    fn map(entries: &[(&str, &str)]) -> ImageMap {
        entries
            .iter()
            .map(|(remote, local)| (remote.to_string(), local.to_string()))
            .collect()
    }

    fn entries_in(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_downloads_then_hits_cache() {
        let public = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default().serving(URL_A, b"png-a");
        let images = map(&[(URL_A, "/images/notion/s/a/0123456789ab.png")]);
        let dirs = MediaDirs::new(public.path());

        let first = materialize_media(&fetcher, &images, &dirs, &Logger::new()).await;
        let second = materialize_media(&fetcher, &images, &dirs, &Logger::new()).await;

        assert_eq!(first.downloaded, 1);
        assert_eq!(second, DownloadReport { cached: 1, ..DownloadReport::default() });
        assert_eq!(fetcher.calls().len(), 1);

        let written = public.path().join("images/notion/s/a/0123456789ab.png");
        assert_eq!(std::fs::read(&written).unwrap(), b"png-a");
        assert_eq!(entries_in(written.parent().unwrap()), vec!["0123456789ab.png"]);
    }

    #[tokio::test]
    async fn test_cached_asset_copied_into_new_dist_without_fetch() {
        let public = tempfile::tempdir().unwrap();
        let dist = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default().serving(URL_A, b"png-a");
        let images = map(&[(URL_A, "/images/notion/s/a/0123456789ab.png")]);

        materialize_media(&fetcher, &images, &MediaDirs::new(public.path()), &Logger::new()).await;

        let dirs = MediaDirs::new(public.path()).with_dist_dir(dist.path());
        let report = materialize_media(&fetcher, &images, &dirs, &Logger::new()).await;

        assert_eq!(report.cached, 1);
        assert_eq!(report.copied, 1);
        assert_eq!(fetcher.calls().len(), 1);
        assert_eq!(
            std::fs::read(dist.path().join("images/notion/s/a/0123456789ab.png")).unwrap(),
            b"png-a"
        );

        let again = materialize_media(&fetcher, &images, &dirs, &Logger::new()).await;
        assert_eq!(again.copied, 0);
    }

    #[tokio::test]
    async fn test_fresh_download_written_to_both_dirs() {
        let public = tempfile::tempdir().unwrap();
        let dist = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default().serving(URL_A, b"png-a");
        let images = map(&[(URL_A, "/images/notion/s/a/0123456789ab.png")]);
        let dirs = MediaDirs::new(public.path()).with_dist_dir(dist.path());

        let report = materialize_media(&fetcher, &images, &dirs, &Logger::new()).await;

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.copied, 0);
        for root in [public.path(), dist.path()] {
            assert_eq!(
                std::fs::read(root.join("images/notion/s/a/0123456789ab.png")).unwrap(),
                b"png-a"
            );
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_assets() {
        let public = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default()
            .failing(URL_A, 403)
            .serving(URL_B, b"png-b");
        let images = map(&[
            (URL_A, "/images/notion/s/a/aaaaaaaaaaaa.png"),
            (URL_B, "/images/notion/s/a/bbbbbbbbbbbb.png"),
        ]);

        let report = materialize_media(&fetcher, &images, &MediaDirs::new(public.path()), &Logger::new()).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.downloaded, 1);
        assert!(!public.path().join("images/notion/s/a/aaaaaaaaaaaa.png").exists());
        assert!(public.path().join("images/notion/s/a/bbbbbbbbbbbb.png").exists());

        // the failed asset is retried on the next run
        materialize_media(&fetcher, &images, &MediaDirs::new(public.path()), &Logger::new()).await;
        assert_eq!(fetcher.calls().iter().filter(|u| u.as_str() == URL_A).count(), 2);
    }

    #[tokio::test]
    async fn test_downloads_in_map_order() {
        let public = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default()
            .serving(URL_A, b"png-a")
            .serving(URL_B, b"png-b");
        let images = map(&[
            (URL_B, "/images/notion/s/a/bbbbbbbbbbbb.png"),
            (URL_A, "/images/notion/s/a/aaaaaaaaaaaa.png"),
        ]);

        materialize_media(&fetcher, &images, &MediaDirs::new(public.path()), &Logger::new()).await;

        assert_eq!(fetcher.calls(), vec![URL_B, URL_A]);
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let public = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default().serving(URL_A, b"png-a");
        let images = map(&[(URL_A, "/images/../../etc/passwd")]);

        let report = materialize_media(&fetcher, &images, &MediaDirs::new(public.path()), &Logger::new()).await;

        assert_eq!(report.failed, 1);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be replaced by a file
        let target = dir.path().join("taken.png");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("inner"), b"x").unwrap();

        assert!(write_atomic(&target, b"png").await.is_err());

        let mut names = entries_in(dir.path());
        names.sort();
        assert_eq!(names, vec!["taken.png"]);
    }

    #[test]
    fn test_resolve() {
        let root = Path::new("/srv/public");
        assert_eq!(
            resolve(root, "/images/notion/s/a/x.png"),
            Some(PathBuf::from("/srv/public/images/notion/s/a/x.png"))
        );
        assert_eq!(resolve(root, "/"), None);
        assert_eq!(resolve(root, "/images/../x.png"), None);
    }
}
