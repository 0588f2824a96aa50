//! Chapter discovery: find the novel title and the ordered, de-duplicated chapter links on a
//! landing or listing page.

use super::client::Transport;
use super::error::ScraperError;
use super::sites::{AnchorRule, LinkRule, ListingRule, SiteProfile};
use super::{element_text, first_text, parse_selector, NovelSource, Site};
use crate::model::ChapterLink;
use regex::Regex;
use reqwest::Url;
use scraper::Html;
use serde::Deserialize;
use std::collections::HashSet;

const UNKNOWN_NOVEL_TITLE: &str = "Unknown Novel";

/// Result of discovery: the novel title and chapter links in fetch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub novel_title: String,
    pub links: Vec<ChapterLink>,
}

/// Site-specific strategy for discovering a novel's chapters.
pub trait SiteAdapter: Send + Sync {
    /// Selector table used for chapter extraction and pacing.
    fn profile(&self) -> &SiteProfile;

    fn site(&self) -> Site {
        self.profile().site
    }

    /// Load the listing page and return the title and chapter links. Zero links is an error.
    fn discover_chapters(
        &self,
        transport: &dyn Transport,
        source: &NovelSource,
    ) -> Result<Discovery, ScraperError>;
}

/// Adapter driven entirely by a static [SiteProfile].
#[derive(Debug, Clone, Copy)]
pub struct TableAdapter {
    profile: &'static SiteProfile,
}

impl TableAdapter {
    pub fn new(profile: &'static SiteProfile) -> Self {
        Self { profile }
    }
}

impl SiteAdapter for TableAdapter {
    fn profile(&self) -> &SiteProfile {
        self.profile
    }

    fn discover_chapters(
        &self,
        transport: &dyn Transport,
        source: &NovelSource,
    ) -> Result<Discovery, ScraperError> {
        let listing = listing_url(self.profile.listing, &source.url);
        tracing::info!(site = self.profile.site.name(), url = %listing, "discovering chapters");
        let page = transport.get(listing.as_str())?;
        if !(200..300).contains(&page.status) {
            tracing::debug!(url = %listing, status = page.status, "listing page returned error status");
        }
        let base = Url::parse(&page.url).unwrap_or_else(|_| listing.clone());
        let discovery = parse_listing(self.profile, &page.body, &base);
        if discovery.links.is_empty() {
            return Err(ScraperError::NoChaptersFound {
                site: self.profile.site.name().to_string(),
                url: listing.to_string(),
            });
        }
        tracing::info!(
            title = %discovery.novel_title,
            chapters = discovery.links.len(),
            "chapters discovered"
        );
        Ok(discovery)
    }
}

/// Page that lists chapters for a novel URL.
pub(crate) fn listing_url(rule: ListingRule, url: &Url) -> Url {
    match rule {
        ListingRule::AsGiven => url.clone(),
        ListingRule::AppendSegment(segment) => {
            let path = url.path().trim_end_matches('/');
            if path.ends_with(&format!("/{}", segment)) {
                return url.clone();
            }
            let mut listing = url.clone();
            listing.set_path(&format!("{}/{}", path, segment));
            listing
        }
    }
}

/// Parse a listing page. `base` resolves relative links and is itself never a chapter.
pub fn parse_listing(profile: &SiteProfile, html: &str, base: &Url) -> Discovery {
    let doc = Html::parse_document(html);
    let novel_title = novel_title(&doc, profile);
    let mut links = LinkSet::new(base);
    match &profile.links {
        LinkRule::Anchors(rule) => collect_anchors(&doc, rule, &mut links),
        LinkRule::EmbeddedToc { needle, fallback } => {
            collect_embedded_toc(html, needle, &mut links);
            if links.is_empty() {
                tracing::debug!(needle = *needle, "embedded chapter list missing, scanning anchors");
                collect_anchors(&doc, fallback, &mut links);
            }
        }
    }
    Discovery {
        novel_title,
        links: links.into_links(),
    }
}

fn novel_title(doc: &Html, profile: &SiteProfile) -> String {
    let candidates = profile
        .novel_title_selectors
        .iter()
        .copied()
        .chain(std::iter::once("h1"));
    first_text(doc, candidates)
        .or_else(|| {
            if profile.page_title_fallback {
                page_title(doc)
            } else {
                None
            }
        })
        .unwrap_or_else(|| UNKNOWN_NOVEL_TITLE.to_string())
}

/// `<title>` text before the first `|`.
fn page_title(doc: &Html) -> Option<String> {
    let sel = parse_selector("title")?;
    let text = element_text(doc.select(&sel).next()?);
    let head = text.split('|').next().unwrap_or_default().trim().to_string();
    (!head.is_empty()).then_some(head)
}

/// Ordered, de-duplicated absolute http(s) links, excluding the listing page itself.
struct LinkSet {
    own_url: String,
    base: Url,
    seen: HashSet<String>,
    links: Vec<ChapterLink>,
    reversed: bool,
}

impl LinkSet {
    fn new(base: &Url) -> Self {
        let mut own = base.clone();
        own.set_fragment(None);
        Self {
            own_url: own.to_string(),
            base: base.clone(),
            seen: HashSet::new(),
            links: Vec::new(),
            reversed: false,
        }
    }

    fn len(&self) -> usize {
        self.links.len()
    }

    fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Resolve `href` and keep it if it is a new http(s) link matching `path_pattern`.
    fn push(&mut self, href: &str, path_pattern: Option<&Regex>) {
        let Ok(mut url) = self.base.join(href.trim()) else {
            return;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return;
        }
        url.set_fragment(None);
        if path_pattern.is_some_and(|re| !re.is_match(url.path())) {
            return;
        }
        let url = url.to_string();
        if url != self.own_url && self.seen.insert(url.clone()) {
            self.links.push(ChapterLink::new(url));
        }
    }

    fn into_links(mut self) -> Vec<ChapterLink> {
        if self.reversed {
            self.links.reverse();
        }
        self.links
    }
}

fn collect_anchors(doc: &Html, rule: &AnchorRule, links: &mut LinkSet) {
    let pattern = match rule.path_pattern.map(Regex::new).transpose() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "invalid chapter path pattern");
            return;
        }
    };
    for group in rule.groups {
        let Some(selector) = parse_selector(group) else {
            continue;
        };
        for anchor in doc.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !rule.text.accepts(&element_text(anchor)) {
                continue;
            }
            links.push(href, pattern.as_ref());
        }
        if rule.stop_after.is_some_and(|n| links.len() > n) {
            break;
        }
    }
    links.reversed = rule.newest_first;
}

/// One entry of an inline `window.chapters`-style array.
#[derive(Debug, Deserialize)]
struct TocEntry {
    url: String,
    #[serde(default)]
    order: Option<u32>,
    #[serde(rename = "isUnlocked", default = "default_true")]
    is_unlocked: bool,
}

fn default_true() -> bool {
    true
}

fn collect_embedded_toc(html: &str, needle: &str, links: &mut LinkSet) {
    let Some(start) = html.find(needle) else {
        return;
    };
    let Some(array) = extract_json_array(&html[start + needle.len()..]) else {
        tracing::debug!(needle, "embedded chapter array is not terminated");
        return;
    };
    let mut entries: Vec<TocEntry> = match serde_json::from_str(array) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(error = %e, "embedded chapter array is not valid JSON");
            return;
        }
    };
    entries.sort_by_key(|e| e.order.unwrap_or(u32::MAX));
    let locked = entries.iter().filter(|e| !e.is_unlocked).count();
    if locked > 0 {
        tracing::debug!(locked, "skipping locked chapters");
    }
    for entry in entries.iter().filter(|e| e.is_unlocked) {
        links.push(&entry.url, None);
    }
}

/// Slice from the first `[` to its matching `]`, skipping brackets inside JSON strings.
fn extract_json_array(s: &str) -> Option<&str> {
    let start = s.find('[')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (offset, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escape => escape = false,
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + offset + 1]);
                }
            }
            '"' => in_string = true,
            _ => {}
        }
    }
    None
}
