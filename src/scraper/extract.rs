//! Chapter content extraction: pick the best-matching body container from a site's selector
//! table, fall back to rebuilding paragraphs, then strip page chrome and navigation text.
//!
//! Output is an XHTML-compatible fragment: only text-bearing elements and a handful of
//! attributes survive, void elements are self-closed and text is re-escaped.

use super::sites::{SiteProfile, GENERIC_CONTENT_SELECTORS, GENERIC_TITLE_SELECTOR};
use super::{element_text, first_text, parse_selector};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

/// Content returned when a page yields almost nothing readable.
pub const UNAVAILABLE_CONTENT: &str = "<p>[Chapter content not available]</p>";

const DEFAULT_CHAPTER_TITLE: &str = "Chapter";
const MIN_SELECTED_CHARS: usize = 100;
const MIN_PARAGRAPH_CHARS: usize = 20;
const MIN_CONTENT_CHARS: usize = 50;

const BASE_NOISE: &str = "script, style, nav, header, footer, button";
const KEPT_ATTRIBUTES: &[&str] = &["href", "src", "alt", "title"];
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

static ARROW_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Use arrow keys \(or A / D\) to PREV/NEXT chapter").expect("valid regex")
});
static ARROW_HINT_LOOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Use arrow keys.*?chapter").expect("valid regex"));
static ARROW_PAIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"←.*?→").expect("valid regex"));
static PREV_NEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Previous Chapter.*?Next Chapter").expect("valid regex"));
static NAV_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:previous|prev|next)\s+chapter\b").expect("valid regex")
});
static EMPTY_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p>\s*</p>").expect("valid regex"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Title and cleaned body of one chapter page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedChapter {
    pub title: String,
    pub content: String,
}

impl ExtractedChapter {
    /// True when extraction fell back to [UNAVAILABLE_CONTENT].
    pub fn is_unavailable(&self) -> bool {
        self.content == UNAVAILABLE_CONTENT
    }
}

/// Extract the chapter title and sanitized body from a parsed page.
pub fn extract_chapter(doc: &Html, profile: &SiteProfile) -> ExtractedChapter {
    let title_candidates = profile.title_selectors.iter().copied().chain(
        (!profile.title_selectors.contains(&GENERIC_TITLE_SELECTOR))
            .then_some(GENERIC_TITLE_SELECTOR),
    );
    let title =
        first_text(doc, title_candidates).unwrap_or_else(|| DEFAULT_CHAPTER_TITLE.to_string());

    let noise = NoiseFilter::new(profile.noise_selectors);
    let raw = select_content(doc, profile, &noise)
        .unwrap_or_else(|| rebuild_paragraphs(doc, &noise));
    let mut content = tidy_markup(&raw);
    if content.chars().count() < MIN_CONTENT_CHARS {
        content = UNAVAILABLE_CONTENT.to_string();
    }
    ExtractedChapter { title, content }
}

/// First candidate container whose sanitized markup is long enough.
fn select_content(doc: &Html, profile: &SiteProfile, noise: &NoiseFilter) -> Option<String> {
    let generic = GENERIC_CONTENT_SELECTORS
        .iter()
        .filter(|sel| !profile.content_selectors.contains(*sel));
    profile
        .content_selectors
        .iter()
        .chain(generic)
        .find_map(|sel| {
            let selector = parse_selector(sel)?;
            let container = doc.select(&selector).next()?;
            let mut markup = String::new();
            write_children(container, noise, &mut markup);
            if markup.chars().count() > MIN_SELECTED_CHARS {
                tracing::trace!(selector = *sel, "content container selected");
                Some(markup)
            } else {
                None
            }
        })
}

/// Every substantial `<p>` outside page chrome, re-wrapped in document order.
fn rebuild_paragraphs(doc: &Html, noise: &NoiseFilter) -> String {
    let Some(p_sel) = parse_selector("p") else {
        return String::new();
    };
    doc.select(&p_sel)
        .filter(|p| !noise.covers(*p))
        .map(element_text)
        .filter(|text| !is_navigation(text))
        .map(|text| strip_nav_phrases(&text).trim().to_string())
        .filter(|text| text.chars().count() > MIN_PARAGRAPH_CHARS)
        .map(|text| format!("<p>{}</p>", escape_text(&text)))
        .collect()
}

/// Remove reader-navigation phrases from one run of text. Never sees markup, so a match
/// cannot span elements.
fn strip_nav_phrases(text: &str) -> String {
    let s = ARROW_HINT.replace_all(text, "");
    let s = ARROW_HINT_LOOSE.replace_all(&s, "");
    let s = ARROW_PAIR.replace_all(&s, "");
    PREV_NEXT.replace_all(&s, "").into_owned()
}

/// Element text made only of navigation labels and separators.
fn is_navigation(text: &str) -> bool {
    let stripped = strip_nav_phrases(text);
    let stripped = NAV_LABEL.replace_all(&stripped, "");
    stripped.len() != text.len() && !stripped.chars().any(char::is_alphanumeric)
}

fn tidy_markup(markup: &str) -> String {
    let s = EMPTY_PARAGRAPH.replace_all(markup, "");
    let s = BLANK_RUN.replace_all(&s, "\n\n");
    s.trim().to_string()
}

/// Elements that never belong in a chapter body.
struct NoiseFilter {
    selectors: Vec<Selector>,
}

impl NoiseFilter {
    fn new(site_noise: &[&str]) -> Self {
        let selectors = std::iter::once(BASE_NOISE)
            .chain(site_noise.iter().copied())
            .filter_map(parse_selector)
            .collect();
        Self { selectors }
    }

    fn matches(&self, el: ElementRef<'_>) -> bool {
        self.selectors.iter().any(|s| s.matches(&el))
    }

    /// The element or one of its ancestors is noise.
    fn covers(&self, el: ElementRef<'_>) -> bool {
        self.matches(el) || el.ancestors().filter_map(ElementRef::wrap).any(|a| self.matches(a))
    }
}

fn write_children(el: ElementRef<'_>, noise: &NoiseFilter, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_text(&strip_nav_phrases(text))),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !noise.matches(child_el) && !is_navigation(&element_text(child_el)) {
                        write_element(child_el, noise, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn write_element(el: ElementRef<'_>, noise: &NoiseFilter, out: &mut String) {
    let name = el.value().name();
    out.push('<');
    out.push_str(name);
    for (attr, value) in el.value().attrs() {
        if !KEPT_ATTRIBUTES.contains(&attr) {
            continue;
        }
        if attr == "href" && value.trim_start().to_ascii_lowercase().starts_with("javascript:") {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    if VOID_ELEMENTS.contains(&name) {
        out.push_str("/>");
        return;
    }
    out.push('>');
    write_children(el, noise, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Characters XML 1.0 allows in content.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c if is_xml_char(c) => out.push(c),
            _ => {}
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
