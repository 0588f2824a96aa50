//! novelscrape: collects web novel chapters from supported sites and packages them as EPUB,
//! JSON, HTML, Markdown or plain text.

pub mod cli;
pub mod config;
pub mod epub;
pub mod formats;
pub mod model;
pub mod scraper;
pub mod session;

// Re-exports for CLI and consumers.
pub use epub::{write_epub, write_epub_to, EpubError};
pub use formats::{write_html, write_json, write_markdown, write_text, FormatError, OutputFormat};
pub use model::{AcquisitionResult, BookMeta, Chapter, ChapterLink, NovelInfo, ProgressEvent};
pub use scraper::{
    fetch_novel_info, resolve, Acquirer, ChapterFetcher, HttpTransport, HttpTransportBuilder,
    NovelSource, ProgressSink, RetryPolicy, ScraperError, Site, SiteAdapter, Transport,
};
pub use session::SessionStore;
