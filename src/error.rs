//! Error kinds produced by the crawling engine.
//!
//! Plumbing code (I/O, config assembly) returns `anyhow::Result` with
//! `.context(...)` annotations throughout this crate; this module carries
//! only the error *kinds* a caller needs to branch on.

use thiserror::Error;

/// Errors surfaced by URL normalization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("could not parse URL: {0}")]
    InvalidUrl(String),
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Errors surfaced by `Resource::fetch`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout_ms}ms")]
    RequestTimeout { url: String, timeout_ms: u64 },

    #[error("transport error fetching {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    HttpError { url: String, status: u16 },

    #[error("redirect chain from {url} exceeded {max_redirects} hops")]
    TooManyRedirects { url: String, max_redirects: u8 },

    #[error("{url} redirected ({status}) without a Location header")]
    MissingLocation { url: String, status: u16 },

    #[error(transparent)]
    Url(#[from] UrlError),
}

/// Programmer-error variants for `Resource` text/URL access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource at {0} is not HTML")]
    NotHtml(String),
}

/// Errors surfaced by `Crawler` lifecycle and execution.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("crawler has already been started")]
    AlreadyStarted,

    #[error("crawler has not been started yet")]
    NotStarted,

    #[error("crawl() has already been called on this session")]
    AlreadyCrawling,

    #[error("origin server did not become ready within {0:?}")]
    BootTimeout(std::time::Duration),

    #[error("origin server died mid-crawl")]
    ServerDied,

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
