pub mod config;
pub mod error;
pub mod logging;
pub mod remote;
pub mod richtext;
pub mod types;

pub use config::{ApiGeneration, NotionDatabase, PropertySchema, SiteConfig, StatusKind};
pub use error::Error;
pub use remote::{AssetFetcher, DatabaseQuery, NotionApi, PaginatedList};
pub use richtext::{render_rich_text, Annotations, RichTextSpan};
pub use types::{Article, ArticlePath, ArticleWithContent, Block, ImageMap, Series};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::remote::{AssetFetcher, NotionApi};
    pub use super::{Article, Block, Error, Result, Series, SiteConfig};
}
