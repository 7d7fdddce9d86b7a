//! URL normalization — the single storage-comparable form used everywhere a
//! URL is kept in memory or on disk.
//!
//! Shaped after `imurl::ImUrl` (an `Arc`-backed, cheaply cloneable URL
//! wrapper) and `link_index::normalize_url` (the ad hoc scheme/host/port/
//! path normalizer used for dedup). This type merges both into one
//! normalizer that also sorts query keys and collapses duplicate path
//! slashes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use url::Url;

use crate::error::UrlError;

/// An immutable, cheaply-cloneable canonical URL.
///
/// Every `CanonicalUrl` in existence is already normalized: lowercased
/// host, default port stripped, collapsed path slashes, sorted query, no
/// fragment. There is no way to construct one except through [`normalize`].
#[derive(Clone, Debug, Eq)]
pub struct CanonicalUrl {
    inner: Arc<Url>,
}

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.inner.host_str()
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.query()
    }

    /// `scheme://host[:port]`, used to decide same-origin-ness.
    pub fn origin(&self) -> String {
        match self.inner.port() {
            Some(port) => format!("{}://{}:{}", self.scheme(), self.host().unwrap_or(""), port),
            None => format!("{}://{}", self.scheme(), self.host().unwrap_or("")),
        }
    }

    pub fn as_url(&self) -> &Url {
        &self.inner
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl PartialEq for CanonicalUrl {
    fn eq(&self, other: &Self) -> bool {
        self.inner.as_str() == other.inner.as_str()
    }
}

impl Hash for CanonicalUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.as_str().hash(state);
    }
}

/// Result of attempting to normalize a string into a storage-comparable URL.
///
/// Certain inputs (`data:`, `javascript:`, `mailto:`, `tel:`, empty or
/// pure-fragment strings) are not crawlable at all; callers must treat
/// [`Normalized::Skip`] as "skip this one", not as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Url(CanonicalUrl),
    Skip,
}

impl Normalized {
    pub fn into_url(self) -> Option<CanonicalUrl> {
        match self {
            Self::Url(u) => Some(u),
            Self::Skip => None,
        }
    }
}

const SKIPPED_SCHEMES: &[&str] = &["data:", "javascript:", "mailto:", "tel:"];

fn is_non_crawlable(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    SKIPPED_SCHEMES.iter().any(|s| lower.starts_with(s))
}

/// Does `input` look like a bare host (`example.com/path`) rather than a
/// path or an already-schemed URL? Used only when no base is supplied.
fn looks_host_like(input: &str) -> bool {
    !input.starts_with('/') && !input.starts_with('.') && input.contains('.')
}

/// Normalize `input` (optionally resolved against `base`) into a
/// [`Normalized`].
pub fn normalize(input: &str, base: Option<&CanonicalUrl>) -> Result<Normalized, UrlError> {
    if is_non_crawlable(input) {
        return Ok(Normalized::Skip);
    }

    let trimmed = input.trim();

    let parsed = match base {
        Some(base) => base
            .as_url()
            .join(trimmed)
            .map_err(|e| UrlError::InvalidUrl(format!("{trimmed}: {e}")))?,
        None => {
            let candidate = if !trimmed.contains("://") && looks_host_like(trimmed) {
                format!("http://{trimmed}")
            } else {
                trimmed.to_string()
            };
            Url::parse(&candidate).map_err(|e| UrlError::InvalidUrl(format!("{trimmed}: {e}")))?
        }
    };

    if parsed.host_str().is_none() {
        return Err(UrlError::MissingHost(parsed.to_string()));
    }

    Ok(Normalized::Url(CanonicalUrl {
        inner: Arc::new(canonicalize(parsed)),
    }))
}

/// Convenience: normalize and require a crawlable URL, treating a `Skip`
/// result as `InvalidUrl`. Used where the caller already knows the input
/// must resolve to something storable (e.g. seeding the frontier).
pub fn normalize_required(input: &str, base: Option<&CanonicalUrl>) -> Result<CanonicalUrl, UrlError> {
    match normalize(input, base)? {
        Normalized::Url(u) => Ok(u),
        Normalized::Skip => Err(UrlError::InvalidUrl(input.to_string())),
    }
}

fn canonicalize(mut url: Url) -> Url {
    url.set_fragment(None);

    if let Some(host) = url.host_str() {
        let lower = host.to_ascii_lowercase();
        if lower != host {
            let _ = url.set_host(Some(&lower));
        }
    }

    if let Some(port) = url.port() {
        let default_port = match url.scheme() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        };
        if Some(port) == default_port {
            let _ = url.set_port(None);
        }
    }

    let collapsed = collapse_slashes(url.path());
    if collapsed != url.path() {
        url.set_path(&collapsed);
    }

    if let Some(query) = url.query() {
        if let Some(sorted) = sort_query(query) {
            url.set_query(Some(&sorted));
        }
    }

    url
}

/// Replace runs of `/` with a single `/`, preserving a trailing slash.
fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}

/// Re-serialize a query string with keys sorted ascending (stable on
/// equal keys, so repeated keys keep their relative order).
fn sort_query(query: &str) -> Option<String> {
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    Some(
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish(),
    )
}
