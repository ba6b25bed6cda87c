pub mod download;
pub mod fetcher;
pub mod localize;

pub use download::{materialize_media, DownloadReport, MediaDirs};
pub use fetcher::HttpAssetFetcher;
pub use localize::{local_image_path, localize_media, IMAGE_ROOT};
