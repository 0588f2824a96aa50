//! Per-site selector tables. Adding a site means adding a profile here and a host rule in the
//! dispatcher; the extractor, fetcher and adapter are shared.

use super::Site;
use rand::Rng;
use std::time::Duration;

/// Content candidates tried after a site's own selectors.
pub(crate) const GENERIC_CONTENT_SELECTORS: &[&str] = &[
    "article",
    ".chapter-content",
    "#chapter-content",
    ".content",
    ".post-content",
    ".story-content",
    ".text-content",
    "main",
    "[role='main']",
    ".article-content",
    ".entry-content",
    "[class*='content']",
];

/// Chapter-page title fallback after a site's own selectors.
pub(crate) const GENERIC_TITLE_SELECTOR: &str = "h1";

/// Everything the shared pipeline needs to know about one site family.
#[derive(Debug)]
pub struct SiteProfile {
    pub site: Site,
    /// Chapter heading candidates, tried before `h1`.
    pub title_selectors: &'static [&'static str],
    /// Chapter body candidates, tried before the generic list.
    pub content_selectors: &'static [&'static str],
    /// Extra elements dropped from chapter bodies (ads, hidden notices).
    pub noise_selectors: &'static [&'static str],
    /// Novel title candidates on the landing page, tried before `h1`.
    pub novel_title_selectors: &'static [&'static str],
    /// Fall back to the `<title>` text before the first `|` when no heading matches.
    pub page_title_fallback: bool,
    pub listing: ListingRule,
    pub links: LinkRule,
    pub chapter_delay: DelayRange,
}

/// Where the chapter list lives relative to the URL the user gave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingRule {
    AsGiven,
    /// Append this path segment unless the path already ends with it.
    AppendSegment(&'static str),
}

/// How chapter links are recognised on the listing page.
#[derive(Debug, Clone, Copy)]
pub enum LinkRule {
    Anchors(AnchorRule),
    /// A JSON array assigned in an inline script (`<needle>[{"url": ...}, ...]`), with anchors
    /// as a fallback when the script is missing.
    EmbeddedToc {
        needle: &'static str,
        fallback: AnchorRule,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct AnchorRule {
    /// Selector groups scanned in order. Comma-joined selectors inside one group keep
    /// document order.
    pub groups: &'static [&'static str],
    pub text: TextFilter,
    /// Regex the absolute link path must match.
    pub path_pattern: Option<&'static str>,
    /// Stop scanning further groups once more than this many links are known.
    pub stop_after: Option<usize>,
    /// The listing shows newest chapters first.
    pub newest_first: bool,
}

/// Requirement on an anchor's visible text (compared lowercase).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFilter {
    Any,
    Chapter,
    ChapterOrDigit,
    ChapterPartOrDigit,
}

impl TextFilter {
    pub fn accepts(self, text: &str) -> bool {
        let text = text.to_lowercase();
        let has_digit = || text.chars().any(|c| c.is_ascii_digit());
        match self {
            TextFilter::Any => true,
            TextFilter::Chapter => text.contains("chapter"),
            TextFilter::ChapterOrDigit => text.contains("chapter") || has_digit(),
            TextFilter::ChapterPartOrDigit => {
                text.contains("chapter") || text.contains("part") || has_digit()
            }
        }
    }
}

/// Inclusive range for the randomized pause between chapter requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const ZERO: DelayRange = DelayRange::new(0, 0);

    pub fn sample(&self) -> Duration {
        let hi = self.max_ms.max(self.min_ms);
        let ms = if hi == self.min_ms {
            hi
        } else {
            rand::thread_rng().gen_range(self.min_ms..=hi)
        };
        Duration::from_millis(ms)
    }
}

const fn anchors(groups: &'static [&'static str], text: TextFilter) -> AnchorRule {
    AnchorRule {
        groups,
        text,
        path_pattern: None,
        stop_after: None,
        newest_first: false,
    }
}

static FREEWEBNOVEL: SiteProfile = SiteProfile {
    site: Site::FreeWebNovel,
    title_selectors: &["span.chapter"],
    content_selectors: &[
        "#chapter-content",
        ".chapter-content",
        ".chapter-body",
        ".cha-words",
        "#article",
        "article",
    ],
    noise_selectors: &[".ads"],
    novel_title_selectors: &["h1.tit"],
    page_title_fallback: false,
    listing: ListingRule::AppendSegment("chapters"),
    links: LinkRule::Anchors(AnchorRule {
        groups: &[".chapter-list a, a[href*='/novel/']"],
        text: TextFilter::Any,
        path_pattern: Some(r"/novel/(?:.*/)?\d+\.html$"),
        stop_after: None,
        newest_first: false,
    }),
    chapter_delay: DelayRange::new(1000, 1400),
};

static READLIGHTNOVEL: SiteProfile = SiteProfile {
    site: Site::ReadLightNovel,
    title_selectors: &[".chapter-title", ".block-title h1"],
    content_selectors: &["#chapterhidden", ".chapter-content3 .desc", ".chapter-content3"],
    noise_selectors: &[".alert", "small.ads-title"],
    novel_title_selectors: &[".block-title h1"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(anchors(
        &[".chapter-chs a, a[href*='/chapter-']"],
        TextFilter::ChapterOrDigit,
    )),
    chapter_delay: DelayRange::new(800, 2000),
};

static ARCHIVE_OF_OUR_OWN: SiteProfile = SiteProfile {
    site: Site::ArchiveOfOurOwn,
    title_selectors: &["h3.title", "h2.title.heading"],
    content_selectors: &["#chapters .userstuff.module", "#chapters .userstuff", "[role='article']"],
    noise_selectors: &["h3.landmark", ".landmark.heading"],
    novel_title_selectors: &["h2.title.heading", "h2.title"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(anchors(
        &["ol.chapter.index a, a[href*='/chapters/']"],
        TextFilter::Any,
    )),
    chapter_delay: DelayRange::new(1000, 2500),
};

static FANFICTION: SiteProfile = SiteProfile {
    site: Site::FanFiction,
    title_selectors: &["b.xcontrast_txt"],
    content_selectors: &["#storytext", ".storytext", "div[id*='content']"],
    noise_selectors: &[],
    novel_title_selectors: &["b.xcontrast_txt"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(anchors(&["a[href*='/s/']"], TextFilter::ChapterOrDigit)),
    chapter_delay: DelayRange::new(800, 1200),
};

static SCRIBBLEHUB: SiteProfile = SiteProfile {
    site: Site::ScribbleHub,
    title_selectors: &["div.chapter-title"],
    content_selectors: &["#chp_raw.chp_raw", "#chp_raw"],
    noise_selectors: &[".wi_news", ".modern-footnotes-footnote__note"],
    novel_title_selectors: &["div.fic_title"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(AnchorRule {
        groups: &["li.toc_w a.toc_a, a[href*='/read/']"],
        text: TextFilter::Any,
        path_pattern: Some(r"/read/\d+"),
        stop_after: None,
        newest_first: true,
    }),
    chapter_delay: DelayRange::new(1000, 2000),
};

static NOVELUPDATES: SiteProfile = SiteProfile {
    site: Site::NovelUpdates,
    title_selectors: &[],
    content_selectors: &[],
    noise_selectors: &[],
    novel_title_selectors: &[".seriestitlenu"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(AnchorRule {
        groups: &["a.chp-release"],
        text: TextFilter::Any,
        path_pattern: None,
        stop_after: None,
        newest_first: true,
    }),
    chapter_delay: DelayRange::new(1000, 2500),
};

static WUXIAWORLD: SiteProfile = SiteProfile {
    site: Site::Wuxiaworld,
    title_selectors: &[".chapter-title", "h1.chapter-title2"],
    content_selectors: &["div.cha-words", "#chapter-content", ".chapter-content"],
    noise_selectors: &["div[class*='ads']", "div[id*='ads']", ".ad-container"],
    novel_title_selectors: &[".book-name h1"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(anchors(&["a[href*='/chapter/'], a.ch-link"], TextFilter::Any)),
    chapter_delay: DelayRange::new(1000, 1400),
};

static BOXNOVEL: SiteProfile = SiteProfile {
    site: Site::BoxNovel,
    title_selectors: &["#chapter-heading"],
    content_selectors: &[".reading-content .text-left", ".reading-content"],
    noise_selectors: &[".c-ads", ".adsbygoogle"],
    novel_title_selectors: &[".post-title h1"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(AnchorRule {
        groups: &["li.wp-manga-chapter a"],
        text: TextFilter::Any,
        path_pattern: None,
        stop_after: None,
        newest_first: true,
    }),
    chapter_delay: DelayRange::new(800, 2000),
};

static NOVELFULL: SiteProfile = SiteProfile {
    site: Site::NovelFull,
    title_selectors: &["a.chapter-title", ".chapter-title"],
    content_selectors: &["#chapter-content", ".chapter-c"],
    noise_selectors: &[".ads", "div[id^='pf-']"],
    novel_title_selectors: &["h3.title"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(anchors(&["a[href*='chapter']"], TextFilter::Chapter)),
    chapter_delay: DelayRange::new(800, 2000),
};

static MTLNOVEL: SiteProfile = SiteProfile {
    site: Site::MtlNovel,
    title_selectors: &["h1.main-title", "h1.entry-title"],
    content_selectors: &[".par.fontsize-16", ".post-content"],
    noise_selectors: &["amp-ad", ".ads"],
    novel_title_selectors: &["h1.entry-title"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(anchors(
        &["a.ch-link, a[href*='/chapter-']"],
        TextFilter::ChapterOrDigit,
    )),
    chapter_delay: DelayRange::new(800, 2000),
};

static ROYALROAD: SiteProfile = SiteProfile {
    site: Site::RoyalRoad,
    title_selectors: &["h1.font-white.break-word", "h1.font-white"],
    content_selectors: &["div.chapter-inner.chapter-content", ".chapter-content"],
    noise_selectors: &[],
    novel_title_selectors: &["h1.font-white", ".fic-title h1"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::EmbeddedToc {
        needle: "window.chapters = ",
        fallback: AnchorRule {
            groups: &["table#chapters a[href*='/chapter/'], a[href*='/chapter/']"],
            text: TextFilter::Any,
            path_pattern: Some(r"/fiction/\d+/.*chapter/"),
            stop_after: None,
            newest_first: false,
        },
    },
    chapter_delay: DelayRange::new(1000, 2500),
};

static WATTPAD: SiteProfile = SiteProfile {
    site: Site::Wattpad,
    title_selectors: &["h1.h2", "header h1"],
    content_selectors: &["pre", "[data-page-number]", ".panel-reading"],
    noise_selectors: &[".comment-marker"],
    novel_title_selectors: &[".story-info__title", ".sr-only"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(anchors(
        &[".table-of-contents a, a.story-parts__part"],
        TextFilter::Any,
    )),
    chapter_delay: DelayRange::new(1000, 2500),
};

static WEBNOVEL: SiteProfile = SiteProfile {
    site: Site::WebNovel,
    title_selectors: &[".cha-tit h1"],
    content_selectors: &[".chapter-content", ".cha-words", "[class*='content']"],
    noise_selectors: &[".cha-bts", ".j_bottom_comment_area"],
    novel_title_selectors: &[".det-info h1"],
    page_title_fallback: false,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(anchors(&["a[href*='chapter']"], TextFilter::Any)),
    chapter_delay: DelayRange::new(1000, 2500),
};

static GENERIC: SiteProfile = SiteProfile {
    site: Site::Generic,
    title_selectors: &["h1", "[class*='title']"],
    content_selectors: &[],
    noise_selectors: &[],
    novel_title_selectors: &[],
    page_title_fallback: true,
    listing: ListingRule::AsGiven,
    links: LinkRule::Anchors(AnchorRule {
        groups: &[
            "a[href*='/chapter']",
            "a[href*='/part']",
            "a[href*='/episode']",
            "a.chapter",
            "a.chapter-link",
            "li a",
        ],
        text: TextFilter::ChapterPartOrDigit,
        path_pattern: None,
        stop_after: Some(5),
        newest_first: false,
    }),
    chapter_delay: DelayRange::new(800, 2000),
};

pub(crate) fn profile(site: Site) -> &'static SiteProfile {
    match site {
        Site::FreeWebNovel => &FREEWEBNOVEL,
        Site::ReadLightNovel => &READLIGHTNOVEL,
        Site::ArchiveOfOurOwn => &ARCHIVE_OF_OUR_OWN,
        Site::FanFiction => &FANFICTION,
        Site::ScribbleHub => &SCRIBBLEHUB,
        Site::NovelUpdates => &NOVELUPDATES,
        Site::Wuxiaworld => &WUXIAWORLD,
        Site::BoxNovel => &BOXNOVEL,
        Site::NovelFull => &NOVELFULL,
        Site::MtlNovel => &MTLNOVEL,
        Site::RoyalRoad => &ROYALROAD,
        Site::Wattpad => &WATTPAD,
        Site::WebNovel => &WEBNOVEL,
        Site::Generic => &GENERIC,
    }
}
