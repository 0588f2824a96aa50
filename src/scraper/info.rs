//! Landing-page preview: title, short description and cover image.

use super::client::Transport;
use super::error::ScraperError;
use super::sites::SiteProfile;
use super::{element_text, first_text, parse_selector, NovelSource};
use crate::model::NovelInfo;
use reqwest::Url;
use scraper::Html;

const DEFAULT_TITLE: &str = "Novel";
const MIN_DESCRIPTION_CHARS: usize = 20;
const MAX_DESCRIPTION_CHARS: usize = 300;

const DESCRIPTION_SELECTORS: &[&str] = &[
    ".novel-intro",
    ".description",
    "[class*='desc']",
    ".synopsis",
    ".summary",
];

const COVER_SELECTORS: &[&str] = &[
    "img[class*='cover']",
    "img[class*='poster']",
    ".novel-cover img",
    ".book-cover img",
    "img[alt*='cover']",
    "img[src*='cover']",
];

/// Fetch the novel's landing page and read its preview.
pub fn fetch_novel_info(
    transport: &dyn Transport,
    source: &NovelSource,
) -> Result<NovelInfo, ScraperError> {
    let page = transport.get(source.url.as_str())?;
    let base = Url::parse(&page.url).unwrap_or_else(|_| source.url.clone());
    let doc = Html::parse_document(&page.body);
    Ok(parse_novel_info(&doc, &base, source.site.profile()))
}

/// Read title, description and cover from a parsed landing page.
pub fn parse_novel_info(doc: &Html, base: &Url, profile: &SiteProfile) -> NovelInfo {
    let title = first_text(
        doc,
        profile
            .novel_title_selectors
            .iter()
            .copied()
            .chain(std::iter::once("h1")),
    )
    .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let description = DESCRIPTION_SELECTORS.iter().find_map(|sel| {
        let selector = parse_selector(sel)?;
        doc.select(&selector)
            .map(element_text)
            .find(|t| t.chars().count() > MIN_DESCRIPTION_CHARS)
            .map(|t| t.chars().take(MAX_DESCRIPTION_CHARS).collect::<String>())
    });

    let cover_url = COVER_SELECTORS.iter().find_map(|sel| {
        let selector = parse_selector(sel)?;
        let src = doc.select(&selector).next()?.value().attr("src")?;
        base.join(src.trim()).ok().map(|u| u.to_string())
    });

    NovelInfo {
        title,
        description,
        cover_url,
    }
}
