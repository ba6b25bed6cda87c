pub mod adapter;
pub mod assembler;
pub mod cli;
pub mod client;
pub mod fetcher;

#[cfg(test)]
mod test_utils;

pub use adapter::{page_to_article, slugify, PropertyValue};
pub use assembler::ContentAssembler;
pub use cli::{handle_command, sync, ContentCommands};
pub use client::{NotionHttpClient, API_KEY_ENV, NOTION_API_BASE};
pub use fetcher::{fetch_block_tree, fetch_database_entries};

pub mod prelude {
    pub use super::{ContentAssembler, NotionHttpClient};
    pub use ns_core::{Article, ArticleWithContent, Error, Result, Series};
}
