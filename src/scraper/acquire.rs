//! Acquisition orchestrator: resolve, discover, truncate, then fetch chapters one by one with
//! pacing and progress reports.

use super::client::{Sleeper, Transport};
use super::discovery::SiteAdapter;
use super::error::ScraperError;
use super::fetcher::{ChapterFetcher, RetryPolicy};
use super::sites::DelayRange;
use super::{resolve, NovelSource};
use crate::model::{AcquisitionResult, ProgressEvent};

/// Receives progress after discovery and after each chapter.
///
/// Called on the acquiring thread between requests, so implementations must return quickly
/// and must not panic.
pub trait ProgressSink {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F: Fn(ProgressEvent)> ProgressSink for F {
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}

/// Drives whole-novel acquisitions. Holds no per-novel state, so one instance can serve
/// several threads at once.
pub struct Acquirer<'a> {
    transport: &'a dyn Transport,
    sleeper: &'a dyn Sleeper,
    retry: RetryPolicy,
    pacing: Option<DelayRange>,
}

impl<'a> Acquirer<'a> {
    pub fn new(transport: &'a dyn Transport, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            transport,
            sleeper,
            retry: RetryPolicy::default(),
            pacing: None,
        }
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the per-site delay between chapter requests.
    pub fn pacing(mut self, pacing: DelayRange) -> Self {
        self.pacing = Some(pacing);
        self
    }

    /// Acquire up to `limit` chapters of the novel at `url`.
    pub fn acquire(
        &self,
        url: &str,
        limit: usize,
        progress: &dyn ProgressSink,
    ) -> Result<AcquisitionResult, ScraperError> {
        let source = resolve(url)?;
        let adapter = source.adapter();
        self.acquire_with(&adapter, &source, limit, progress)
    }

    /// Acquire with an explicit adapter.
    pub fn acquire_with(
        &self,
        adapter: &dyn SiteAdapter,
        source: &NovelSource,
        limit: usize,
        progress: &dyn ProgressSink,
    ) -> Result<AcquisitionResult, ScraperError> {
        let mut discovery = adapter.discover_chapters(self.transport, source)?;
        if discovery.links.is_empty() {
            return Err(ScraperError::NoChaptersFound {
                site: adapter.site().name().to_string(),
                url: source.url.to_string(),
            });
        }
        discovery.links.truncate(limit);
        let total = discovery.links.len();
        tracing::info!(
            site = adapter.site().name(),
            title = %discovery.novel_title,
            total,
            "acquiring chapters"
        );
        progress.on_progress(ProgressEvent { current: 0, total });

        let profile = adapter.profile();
        let delay = self.pacing.unwrap_or(profile.chapter_delay);
        let fetcher = ChapterFetcher::new(self.transport, self.sleeper, profile, self.retry);
        let mut chapters = Vec::with_capacity(total);
        for (i, link) in discovery.links.iter().enumerate() {
            tracing::debug!(index = i + 1, total, url = %link.url, "fetching chapter");
            chapters.push(fetcher.fetch_chapter(&link.url));
            progress.on_progress(ProgressEvent {
                current: i + 1,
                total,
            });
            if i + 1 < total {
                self.sleeper.sleep(delay.sample());
            }
        }
        tracing::info!(title = %discovery.novel_title, chapters = chapters.len(), "acquisition complete");
        Ok(AcquisitionResult {
            novel_title: discovery.novel_title,
            chapters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::discovery::Discovery;
    use crate::scraper::fetcher::{EXHAUSTED_CONTENT, EXHAUSTED_TITLE};
    use crate::scraper::sites::SiteProfile;
    use crate::scraper::testing::{chapter_page, FakeTransport, RecordingSleeper, Scripted};
    use crate::scraper::{Site, TransportError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const NOVEL: &str = "https://example.com/novel/";

    fn chapter_url(letter: char) -> String {
        format!("https://example.com/novel/chapter-{}", letter.to_ascii_lowercase())
    }

    fn five_chapter_site() -> FakeTransport {
        let listing: String = "ABCDE"
            .chars()
            .map(|c| format!(r#"<a href="{}">Chapter {}</a>"#, chapter_url(c), c))
            .collect();
        let mut transport = FakeTransport::new().with_page(
            NOVEL,
            format!("<html><body><h1>Five Chapters</h1>{}</body></html>", listing),
        );
        for c in "ABCDE".chars() {
            transport = transport.with_page(&chapter_url(c), chapter_page(&format!("Chapter {}", c)));
        }
        transport
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl ProgressSink for Recorder {
        fn on_progress(&self, event: ProgressEvent) {
            if let Ok(mut events) = self.0.lock() {
                events.push(event);
            }
        }
    }

    impl Recorder {
        fn events(&self) -> Vec<ProgressEvent> {
            self.0.lock().map(|v| v.clone()).unwrap_or_default()
        }
    }

    #[test]
    fn truncates_to_limit_in_discovery_order() -> Result<(), ScraperError> {
        let transport = five_chapter_site();
        let sleeper = RecordingSleeper::default();
        let recorder = Recorder::default();
        let result = Acquirer::new(&transport, &sleeper).acquire(NOVEL, 3, &recorder)?;

        assert_eq!(result.novel_title, "Five Chapters");
        let titles: Vec<_> = result.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Chapter A", "Chapter B", "Chapter C"]);
        assert_eq!(transport.calls(&chapter_url('D')), 0);
        assert_eq!(transport.calls(&chapter_url('E')), 0);

        let events = recorder.events();
        let pairs: Vec<_> = events.iter().map(|e| (e.current, e.total)).collect();
        assert_eq!(pairs, [(0, 3), (1, 3), (2, 3), (3, 3)]);

        let pauses = sleeper.slept();
        assert_eq!(pauses.len(), 2);
        for pause in pauses {
            assert!(pause >= Duration::from_millis(800) && pause <= Duration::from_millis(2000));
        }
        Ok(())
    }

    #[test]
    fn failing_chapter_becomes_placeholder_without_aborting() -> Result<(), ScraperError> {
        let transport = five_chapter_site()
            .with_page(&chapter_url('B'), "<html><body><p>Please wait...</p></body></html>");
        let sleeper = RecordingSleeper::default();
        let result = Acquirer::new(&transport, &sleeper)
            .pacing(DelayRange::ZERO)
            .acquire(NOVEL, 3, &NoProgress)?;

        assert_eq!(result.chapters.len(), 3);
        assert_eq!(result.chapters[0].title, "Chapter A");
        assert_eq!(result.chapters[1].title, EXHAUSTED_TITLE);
        assert_eq!(result.chapters[1].content, EXHAUSTED_CONTENT);
        assert_eq!(result.chapters[2].title, "Chapter C");
        assert_eq!(transport.calls(&chapter_url('B')), 3);
        assert!(result.chapters.iter().all(|c| !c.content.is_empty()));
        Ok(())
    }

    #[test]
    fn empty_discovery_is_fatal_and_reports_nothing() {
        let transport = FakeTransport::new()
            .with_page(NOVEL, "<html><body><h1>Nothing here</h1></body></html>");
        let sleeper = RecordingSleeper::default();
        let recorder = Recorder::default();
        let err = Acquirer::new(&transport, &sleeper).acquire(NOVEL, 10, &recorder);
        assert!(matches!(err, Err(ScraperError::NoChaptersFound { .. })));
        assert!(recorder.events().is_empty());
        assert_eq!(transport.total_calls(), 1);
    }

    #[test]
    fn discovery_timeout_is_reported_as_timeout() {
        let transport = FakeTransport::new().with_sequence(NOVEL, vec![Scripted::Timeout]);
        let sleeper = RecordingSleeper::default();
        match Acquirer::new(&transport, &sleeper).acquire(NOVEL, 5, &NoProgress) {
            Err(e) => {
                assert!(e.is_timeout());
                assert!(matches!(e, ScraperError::Transport(TransportError::Timeout { .. })));
            }
            Ok(r) => panic!("expected timeout, got {} chapters", r.chapters.len()),
        }
    }

    #[test]
    fn zero_limit_and_oversized_limit() -> Result<(), ScraperError> {
        let transport = five_chapter_site();
        let sleeper = RecordingSleeper::default();
        let acquirer = Acquirer::new(&transport, &sleeper).pacing(DelayRange::ZERO);

        let recorder = Recorder::default();
        let none = acquirer.acquire(NOVEL, 0, &recorder)?;
        assert!(none.chapters.is_empty());
        assert_eq!(recorder.events(), [ProgressEvent { current: 0, total: 0 }]);

        let all = acquirer.acquire(NOVEL, 200, &NoProgress)?;
        assert_eq!(all.chapters.len(), 5);
        Ok(())
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_total() -> Result<(), ScraperError> {
        let transport = five_chapter_site();
        let sleeper = RecordingSleeper::default();
        let recorder = Recorder::default();
        Acquirer::new(&transport, &sleeper).acquire(NOVEL, 5, &recorder)?;
        let events = recorder.events();
        assert!(events.windows(2).all(|w| w[0].current < w[1].current));
        assert!(events.iter().all(|e| e.current <= e.total && e.total == 5));
        assert_eq!(events.last().map(|e| e.current), Some(5));
        Ok(())
    }

    #[test]
    fn closures_are_progress_sinks() -> Result<(), ScraperError> {
        let transport = five_chapter_site();
        let sleeper = RecordingSleeper::default();
        let last = AtomicUsize::new(usize::MAX);
        let sink = |e: ProgressEvent| last.store(e.current, Ordering::SeqCst);
        Acquirer::new(&transport, &sleeper)
            .pacing(DelayRange::ZERO)
            .acquire(NOVEL, 2, &sink)?;
        assert_eq!(last.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn independent_acquisitions_run_on_separate_threads() -> Result<(), ScraperError> {
        let transport = five_chapter_site();
        let sleeper = RecordingSleeper::default();
        let acquirer = Acquirer::new(&transport, &sleeper).pacing(DelayRange::ZERO);
        let (first, second) = std::thread::scope(|s| {
            let a = s.spawn(|| acquirer.acquire(NOVEL, 2, &NoProgress));
            let b = s.spawn(|| acquirer.acquire(NOVEL, 4, &NoProgress));
            (a.join(), b.join())
        });
        let first = first.map_err(|_| "thread panicked").and_then(|r| r.map_err(|_| "failed"));
        let second = second.map_err(|_| "thread panicked").and_then(|r| r.map_err(|_| "failed"));
        assert_eq!(first.map(|r| r.chapters.len()), Ok(2));
        assert_eq!(second.map(|r| r.chapters.len()), Ok(4));
        Ok(())
    }

    /// Adapter with a fixed link list, bypassing listing parsing.
    struct FixedAdapter {
        links: Vec<String>,
    }

    impl SiteAdapter for FixedAdapter {
        fn profile(&self) -> &SiteProfile {
            Site::Generic.profile()
        }

        fn discover_chapters(
            &self,
            _transport: &dyn Transport,
            _source: &NovelSource,
        ) -> Result<Discovery, ScraperError> {
            Ok(Discovery {
                novel_title: "Fixed".to_string(),
                links: self.links.iter().map(crate::model::ChapterLink::new).collect(),
            })
        }
    }

    #[test]
    fn acquire_with_custom_adapter() -> Result<(), ScraperError> {
        let transport = five_chapter_site();
        let sleeper = RecordingSleeper::default();
        let adapter = FixedAdapter {
            links: vec![chapter_url('E'), chapter_url('A')],
        };
        let source = resolve(NOVEL)?;
        let result = Acquirer::new(&transport, &sleeper)
            .pacing(DelayRange::ZERO)
            .acquire_with(&adapter, &source, 10, &NoProgress)?;
        assert_eq!(result.novel_title, "Fixed");
        let titles: Vec<_> = result.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Chapter E", "Chapter A"]);
        assert_eq!(transport.calls(NOVEL), 0);

        let empty = FixedAdapter { links: Vec::new() };
        let err = Acquirer::new(&transport, &sleeper).acquire_with(&empty, &source, 10, &NoProgress);
        assert!(matches!(err, Err(ScraperError::NoChaptersFound { .. })));
        Ok(())
    }
}
