//! Test doubles for the network and the clock.

use super::client::{Page, Sleeper, Transport};
use super::error::TransportError;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Html(String),
    Status(u16, String),
    Timeout,
}

/// Serves scripted responses per URL and counts calls. The last scripted response for a URL
/// repeats forever; unknown URLs get an empty 404 page.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.with_sequence(url, vec![Scripted::Html(html.into())])
    }

    pub(crate) fn with_sequence(self, url: &str, responses: Vec<Scripted>) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.to_string(), responses.into());
        }
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().map(|c| c.values().sum()).unwrap_or(0)
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str) -> Result<Page, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(url.to_string()).or_insert(0) += 1;
        }
        let next = self.routes.lock().ok().and_then(|mut routes| {
            let queue = routes.get_mut(url)?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });
        let (status, body) = match next {
            Some(Scripted::Html(body)) => (200, body),
            Some(Scripted::Status(status, body)) => (status, body),
            Some(Scripted::Timeout) => {
                return Err(TransportError::Timeout {
                    url: url.to_string(),
                })
            }
            None => (404, String::from("<html><body>Not Found</body></html>")),
        };
        Ok(Page {
            url: url.to_string(),
            status,
            body,
        })
    }
}

/// Records requested sleeps instead of sleeping.
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn slept(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

/// A chapter page whose body comfortably passes the length checks.
pub(crate) fn chapter_page(title: &str) -> String {
    let body: String = (1..=4)
        .map(|i| {
            format!(
                "<p>{} paragraph {} carries enough words to count as real prose.</p>",
                title, i
            )
        })
        .collect();
    format!(
        r#"<html><body><h1>{}</h1><div class="chapter-content">{}</div></body></html>"#,
        title, body
    )
}
