//! Chapter acquisition: site dispatch, chapter discovery, extraction, fetch-with-retry and the
//! orchestrator that ties them together.

mod acquire;
mod client;
mod discovery;
mod error;
mod extract;
mod fetcher;
mod info;
mod sites;

#[cfg(test)]
pub(crate) mod testing;

pub use acquire::{Acquirer, NoProgress, ProgressSink};
pub use client::{HttpTransport, HttpTransportBuilder, Page, Sleeper, ThreadSleeper, Transport};
pub use discovery::{parse_listing, Discovery, SiteAdapter, TableAdapter};
pub use error::{ScraperError, TransportError};
pub use extract::{extract_chapter, ExtractedChapter, UNAVAILABLE_CONTENT};
pub(crate) use extract::is_xml_char;
pub use fetcher::{ChapterFetcher, RetryPolicy, EXHAUSTED_CONTENT, EXHAUSTED_TITLE};
pub use info::{fetch_novel_info, parse_novel_info};
pub use sites::{AnchorRule, DelayRange, LinkRule, ListingRule, SiteProfile, TextFilter};

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

/// Supported site families, in dispatch priority order. `Generic` handles everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    FreeWebNovel,
    ReadLightNovel,
    ArchiveOfOurOwn,
    FanFiction,
    ScribbleHub,
    NovelUpdates,
    Wuxiaworld,
    BoxNovel,
    NovelFull,
    MtlNovel,
    RoyalRoad,
    Wattpad,
    WebNovel,
    Generic,
}

/// Host substring checked against the lowercase hostname. First match wins, so
/// "freewebnovel" must come before "webnovel".
const HOST_RULES: &[(&str, Site)] = &[
    ("freewebnovel", Site::FreeWebNovel),
    ("readlightnovel", Site::ReadLightNovel),
    ("archiveofourown", Site::ArchiveOfOurOwn),
    ("fanfiction.net", Site::FanFiction),
    ("scribblehub", Site::ScribbleHub),
    ("novelupdates", Site::NovelUpdates),
    ("wuxiaworld", Site::Wuxiaworld),
    ("boxnovel", Site::BoxNovel),
    ("novelfull", Site::NovelFull),
    ("mtlnovel", Site::MtlNovel),
    ("royalroad", Site::RoyalRoad),
    ("wattpad", Site::Wattpad),
    ("webnovel", Site::WebNovel),
];

impl Site {
    /// Display name used in logs and user-facing messages.
    pub fn name(self) -> &'static str {
        match self {
            Site::FreeWebNovel => "FreeWebNovel",
            Site::ReadLightNovel => "ReadLightNovel",
            Site::ArchiveOfOurOwn => "Archive of Our Own",
            Site::FanFiction => "FanFiction.net",
            Site::ScribbleHub => "ScribbleHub",
            Site::NovelUpdates => "Novel Updates",
            Site::Wuxiaworld => "Wuxiaworld",
            Site::BoxNovel => "BoxNovel",
            Site::NovelFull => "NovelFull",
            Site::MtlNovel => "MTLNovel",
            Site::RoyalRoad => "Royal Road",
            Site::Wattpad => "Wattpad",
            Site::WebNovel => "WebNovel",
            Site::Generic => "Generic",
        }
    }

    /// Selector table and pacing for this site.
    pub fn profile(self) -> &'static SiteProfile {
        sites::profile(self)
    }

    /// Pick the site for a hostname.
    pub fn for_host(host: &str) -> Site {
        let host = host.to_ascii_lowercase();
        HOST_RULES
            .iter()
            .find(|(needle, _)| host.contains(needle))
            .map(|(_, site)| *site)
            .unwrap_or(Site::Generic)
    }
}

/// A novel URL bound to the site family that will handle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelSource {
    pub url: Url,
    pub site: Site,
}

impl NovelSource {
    /// Table-driven adapter for this source's site.
    pub fn adapter(&self) -> TableAdapter {
        TableAdapter::new(self.site.profile())
    }
}

/// Resolve an input URL to its site. Unknown hosts fall back to [Site::Generic].
pub fn resolve(url_input: &str) -> Result<NovelSource, ScraperError> {
    let url = Url::parse(url_input.trim()).map_err(|e| ScraperError::InvalidUrl {
        input: url_input.to_string(),
        reason: e.to_string(),
    })?;
    let host = url.host_str().ok_or_else(|| ScraperError::InvalidUrl {
        input: url_input.to_string(),
        reason: "URL has no host".to_string(),
    })?;
    let site = Site::for_host(host);
    Ok(NovelSource { url, site })
}

/// Parse a CSS selector from a site table. Invalid entries are skipped with a warning.
pub(crate) fn parse_selector(sel: &str) -> Option<Selector> {
    match Selector::parse(sel) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(selector = sel, error = %e, "skipping invalid selector");
            None
        }
    }
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// First non-empty element text across the selectors, in order.
pub(crate) fn first_text<'s>(
    doc: &Html,
    selectors: impl IntoIterator<Item = &'s str>,
) -> Option<String> {
    selectors.into_iter().find_map(|sel| {
        let selector = parse_selector(sel)?;
        doc.select(&selector)
            .map(element_text)
            .find(|t| !t.is_empty())
    })
}
