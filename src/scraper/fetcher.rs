//! Fetch one chapter with bounded retries. A chapter never fails outright: once attempts are
//! exhausted the caller gets a placeholder.

use super::client::{Sleeper, Transport};
use super::extract::extract_chapter;
use super::sites::SiteProfile;
use crate::model::Chapter;
use rand::Rng;
use scraper::Html;
use std::time::Duration;

pub const EXHAUSTED_TITLE: &str = "Chapter";
pub const EXHAUSTED_CONTENT: &str = "<p>[Content unavailable after retries]</p>";

/// An attempt counts as a success only above this many characters of content.
const MIN_SUCCESS_CHARS: usize = 150;

/// Attempt budget and backoff shape. The wait after failed attempt `n` (1-based) is
/// `random(0..=jitter_ms) + n * step_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub jitter_ms: u64,
    pub step_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            jitter_ms: 2000,
            step_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget with the given count, at least one.
    pub fn with_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        Duration::from_millis(jitter + u64::from(attempt) * self.step_ms)
    }
}

/// Per-acquisition chapter fetcher bound to one site profile.
pub struct ChapterFetcher<'a> {
    transport: &'a dyn Transport,
    sleeper: &'a dyn Sleeper,
    profile: &'a SiteProfile,
    retry: RetryPolicy,
}

impl<'a> ChapterFetcher<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        sleeper: &'a dyn Sleeper,
        profile: &'a SiteProfile,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            profile,
            retry,
        }
    }

    /// Fetch and extract one chapter, retrying short or failed responses.
    pub fn fetch_chapter(&self, url: &str) -> Chapter {
        let attempts = self.retry.max_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(chapter) = self.attempt(url, attempt) {
                return chapter;
            }
            if attempt < attempts {
                let wait = self.retry.backoff(attempt);
                tracing::debug!(url, attempt, wait_ms = wait.as_millis() as u64, "retrying chapter");
                self.sleeper.sleep(wait);
            }
        }
        tracing::warn!(url, attempts, "chapter unavailable after retries");
        Chapter {
            title: EXHAUSTED_TITLE.to_string(),
            content: EXHAUSTED_CONTENT.to_string(),
        }
    }

    fn attempt(&self, url: &str, attempt: u32) -> Option<Chapter> {
        let page = match self.transport.get(url) {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!(url, attempt, error = %e, "chapter request failed");
                return None;
            }
        };
        if !(200..300).contains(&page.status) {
            tracing::debug!(url, attempt, status = page.status, "non-success status, extracting anyway");
        }
        let doc = Html::parse_document(&page.body);
        let extracted = extract_chapter(&doc, self.profile);
        let chars = extracted.content.chars().count();
        if chars > MIN_SUCCESS_CHARS && !extracted.is_unavailable() {
            Some(Chapter {
                title: extracted.title,
                content: extracted.content,
            })
        } else {
            tracing::debug!(url, attempt, chars, "chapter content too short");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::{chapter_page, FakeTransport, RecordingSleeper, Scripted};
    use crate::scraper::Site;

    const URL: &str = "https://example.com/novel/chapter-1";

    fn fetch(transport: &FakeTransport, sleeper: &RecordingSleeper) -> Chapter {
        ChapterFetcher::new(transport, sleeper, Site::Generic.profile(), RetryPolicy::default())
            .fetch_chapter(URL)
    }

    #[test]
    fn first_good_response_is_returned_without_sleeping() {
        let transport = FakeTransport::new().with_page(URL, chapter_page("Chapter 1"));
        let sleeper = RecordingSleeper::default();
        let chapter = fetch(&transport, &sleeper);
        assert_eq!(chapter.title, "Chapter 1");
        assert!(chapter.content.contains("paragraph 4"));
        assert_eq!(transport.calls(URL), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn always_short_content_makes_three_calls_then_placeholder() {
        let transport = FakeTransport::new().with_page(URL, "<html><body><p>Loading</p></body></html>");
        let sleeper = RecordingSleeper::default();
        let chapter = fetch(&transport, &sleeper);
        assert_eq!(transport.calls(URL), 3);
        assert_eq!(chapter.title, EXHAUSTED_TITLE);
        assert_eq!(chapter.content, EXHAUSTED_CONTENT);
        assert_eq!(sleeper.slept().len(), 2);
    }

    #[test]
    fn backoff_grows_with_attempt_and_stays_in_bounds() {
        let transport = FakeTransport::new().with_sequence(URL, vec![Scripted::Timeout]);
        let sleeper = RecordingSleeper::default();
        fetch(&transport, &sleeper);
        let slept = sleeper.slept();
        assert_eq!(slept.len(), 2);
        assert!(slept[0] >= Duration::from_millis(1000) && slept[0] <= Duration::from_millis(3000));
        assert!(slept[1] >= Duration::from_millis(2000) && slept[1] <= Duration::from_millis(4000));
    }

    #[test]
    fn recovers_on_a_later_attempt() {
        let transport = FakeTransport::new().with_sequence(
            URL,
            vec![
                Scripted::Timeout,
                Scripted::Html("<html><body><p>Short</p></body></html>".into()),
                Scripted::Html(chapter_page("Chapter 9")),
            ],
        );
        let sleeper = RecordingSleeper::default();
        let chapter = fetch(&transport, &sleeper);
        assert_eq!(chapter.title, "Chapter 9");
        assert_eq!(transport.calls(URL), 3);
    }

    #[test]
    fn error_status_body_is_still_extracted() {
        let transport = FakeTransport::new()
            .with_sequence(URL, vec![Scripted::Status(503, chapter_page("Chapter 2"))]);
        let sleeper = RecordingSleeper::default();
        assert_eq!(fetch(&transport, &sleeper).title, "Chapter 2");
    }

    #[test]
    fn attempt_budget_is_configurable() {
        let transport = FakeTransport::new().with_sequence(URL, vec![Scripted::Timeout]);
        let sleeper = RecordingSleeper::default();
        let retry = RetryPolicy::default().with_attempts(1);
        ChapterFetcher::new(&transport, &sleeper, Site::Generic.profile(), retry).fetch_chapter(URL);
        assert_eq!(transport.calls(URL), 1);
        assert!(sleeper.slept().is_empty());
        assert_eq!(RetryPolicy::default().with_attempts(0).max_attempts, 1);
    }
}
