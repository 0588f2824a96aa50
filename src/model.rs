//! Data model shared by the acquisition pipeline and the output writers.
//!
//! The scraper produces an [AcquisitionResult]; the EPUB and format writers consume it.

use serde::{Deserialize, Serialize};

/// One chapter in reading order.
///
/// `content` is a sanitized HTML fragment and is never empty: failed fetches carry a
/// placeholder paragraph instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
}

/// Absolute URL of one readable installment, as found during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterLink {
    pub url: String,
}

impl ChapterLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Everything collected for one novel: its title and the chapters in discovery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionResult {
    #[serde(rename = "novelTitle")]
    pub novel_title: String,
    pub chapters: Vec<Chapter>,
}

/// Progress report emitted after each chapter. `current <= total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
}

/// Landing-page preview: title, short description and cover image location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovelInfo {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "coverUrl")]
    pub cover_url: Option<String>,
}

/// Creator recorded in packaged documents when none is configured.
pub const DEFAULT_AUTHOR: &str = "Web Novel";

/// Document metadata that the scrape itself does not provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMeta {
    pub author: String,
    pub description: Option<String>,
    /// Novel URL, used as the package identifier.
    pub source_url: Option<String>,
}

impl Default for BookMeta {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            description: None,
            source_url: None,
        }
    }
}

impl Chapter {
    /// Title for tables of contents: the chapter's own, or "Chapter N" when blank.
    pub fn display_title(&self, number: usize) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            format!("Chapter {}", number)
        } else {
            title.to_string()
        }
    }
}
