//! Error types for the acquisition pipeline.
//!
//! Only request-level failures surface here. Per-chapter failures are absorbed by the
//! chapter fetcher and turn into placeholder chapters.

use thiserror::Error;

/// Failure to obtain a response at all. HTTP error statuses are not transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else {
            TransportError::Network {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

/// Fatal acquisition errors. Each variant maps to a distinct explanation for the user.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("No chapters found on {site} page {url}. The site may be unsupported or its layout changed.")]
    NoChaptersFound { site: String, url: String },

    #[error("Could not load novel page: {0}")]
    Transport(#[from] TransportError),
}

impl ScraperError {
    /// True when the request failed because the site was too slow to answer.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ScraperError::Transport(TransportError::Timeout { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_distinguishable_from_empty_discovery() {
        let timeout = ScraperError::from(TransportError::Timeout {
            url: "https://novelfull.com/a.html".into(),
        });
        let empty = ScraperError::NoChaptersFound {
            site: "NovelFull".into(),
            url: "https://novelfull.com/a.html".into(),
        };
        assert!(timeout.is_timeout());
        assert!(!empty.is_timeout());
        assert!(empty.to_string().contains("No chapters found"));
        assert!(timeout.to_string().contains("timed out"));
    }
}
