//! Blocking HTTP transport and the sleeping seam used for pacing and backoff.
//!
//! The pipeline only talks to the network through [Transport], so tests can script responses
//! and count calls. Every status code is returned as a [Page]; only failures to get a response
//! at all are errors.

use crate::scraper::error::TransportError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const MAX_REDIRECTS: usize = 5;

/// A fetched document. `url` is the final URL after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Source of HTML pages. Implementations must be shareable across acquisition threads.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<Page, TransportError>;
}

/// Blocks the current acquisition for a pacing or backoff delay.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Blocking reqwest client with a browser-like identity, a fixed timeout and a short
/// redirect limit.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport with the default User-Agent and timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Page, TransportError> {
        let response = self
            .inner
            .get(url)
            .send()
            .map_err(|e| TransportError::from_reqwest(url, e))?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.to_string(),
                }
            } else {
                TransportError::Body {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;
        Ok(Page {
            url: final_url,
            status,
            body,
        })
    }
}

/// Builder for [HttpTransport] with optional User-Agent and timeout.
#[derive(Debug)]
pub struct HttpTransportBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
    no_proxy: bool,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            no_proxy: false,
        }
    }
}

impl HttpTransportBuilder {
    /// Set a custom User-Agent. If not set, a desktop Chrome identity is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 15.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    /// Ignore proxy settings from the environment.
    pub fn no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    pub fn build(self) -> Result<HttpTransport, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let mut client = reqwest::blocking::Client::builder();
        if self.no_proxy {
            client = client.no_proxy();
        }
        let inner = client
            .cookie_store(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(HttpTransport { inner })
    }
}
