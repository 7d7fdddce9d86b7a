//! One fetched artifact: bytes, final URL, attempt chain, on-disk emitter.
//!
//! Shaped after `crawl_engine/crawl_types.rs` for the fetch/attempt/failure
//! shape, generalized here into a manual redirect-following protocol
//! (browser automation followed redirects through its navigation layer
//! instead; this crate has no browser, so the protocol is reimplemented
//! directly over `reqwest` with `redirect::Policy::none()`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::{CONTENT_TYPE, LOCATION, USER_AGENT};

use crate::attempt::Attempt;
use crate::canonical_url::{self, CanonicalUrl};
use crate::error::{FetchError, ResourceError};
use crate::link_extractor;
use crate::link_rewriter;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Options for [`fetch`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_redirects: u8,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            max_redirects: 5,
            user_agent: format!("sitecast/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A synchronous resolver callable used in lieu of a network origin.
pub type Resolver = Arc<dyn Fn(&str) -> ResolverResponse + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ResolverResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// One fetched artifact.
pub struct Resource {
    pub final_url: CanonicalUrl,
    pub base_url: CanonicalUrl,
    pub content_type: Option<String>,
    pub body_bytes: Vec<u8>,
    pub attempts: Vec<Attempt>,
    cached_text: OnceLock<String>,
    cached_extracted_urls: OnceLock<HashSet<CanonicalUrl>>,
}

impl Resource {
    pub fn new(
        final_url: CanonicalUrl,
        base_url: CanonicalUrl,
        content_type: Option<String>,
        body_bytes: Vec<u8>,
        attempts: Vec<Attempt>,
    ) -> Self {
        Self {
            final_url,
            base_url,
            content_type,
            body_bytes,
            attempts,
            cached_text: OnceLock::new(),
            cached_extracted_urls: OnceLock::new(),
        }
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    pub fn is_asset(&self) -> bool {
        !self.is_html()
    }

    /// UTF-8 decode of the body. Memoized. Fails with `NotHtml` on a
    /// non-HTML resource.
    pub fn text(&self) -> Result<&str, ResourceError> {
        if !self.is_html() {
            return Err(ResourceError::NotHtml(self.final_url.to_string()));
        }
        Ok(self
            .cached_text
            .get_or_init(|| String::from_utf8_lossy(&self.body_bytes).into_owned()))
    }

    /// Every URL referenced by this resource's HTML, resolved against
    /// `final_url`. Memoized. Fails with `NotHtml` on a non-HTML resource.
    pub fn extract_urls(&self) -> Result<&HashSet<CanonicalUrl>, ResourceError> {
        let text = self.text()?;
        Ok(self
            .cached_extracted_urls
            .get_or_init(|| link_extractor::extract(text, &self.final_url)))
    }

    /// `extract_urls()` partitioned by same-origin-ness with `base_url`.
    pub fn relative_urls(&self) -> Result<Vec<CanonicalUrl>, ResourceError> {
        let origin = self.base_url.origin();
        Ok(self
            .extract_urls()?
            .iter()
            .filter(|u| u.origin() == origin)
            .cloned()
            .collect())
    }

    pub fn external_urls(&self) -> Result<Vec<CanonicalUrl>, ResourceError> {
        let origin = self.base_url.origin();
        Ok(self
            .extract_urls()?
            .iter()
            .filter(|u| u.origin() != origin)
            .cloned()
            .collect())
    }

    /// Where this resource lands on disk.
    pub(crate) fn emission_path(dest_root: &Path, base_path: Option<&str>, url_path: &str, is_html: bool) -> PathBuf {
        let mut path = dest_root.to_path_buf();
        if let Some(normalized) = base_path.and_then(link_rewriter::normalize_base_path) {
            path.push(normalized.trim_start_matches('/'));
        }

        let trimmed = url_path.trim_start_matches('/');
        if is_html {
            if trimmed.is_empty() {
                path.push("index.html");
            } else {
                path.push(trimmed);
                path.push("index.html");
            }
        } else {
            if trimmed.is_empty() {
                path.push("index.html");
            } else {
                path.push(trimmed);
            }
        }
        path
    }

    /// Write this resource to disk under `dest_root`. HTML bodies are
    /// passed through the link rewriter first when `base_path` is set.
    pub fn save(&self, dest_root: &Path, base_path: Option<&str>) -> anyhow::Result<PathBuf> {
        let path = Self::emission_path(dest_root, base_path, self.final_url.path(), self.is_html());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if self.is_html() {
            let text = self.text().map_err(anyhow::Error::from)?;
            let out = match base_path {
                Some(bp) if link_rewriter::normalize_base_path(bp).is_some() => {
                    link_rewriter::rewrite(text, &self.final_url, bp)
                }
                _ => text.to_string(),
            };
            std::fs::write(&path, out)?;
        } else {
            std::fs::write(&path, &self.body_bytes)?;
        }

        Ok(path)
    }

    /// Fetch `path` (resolved against `base_url`), following redirects
    /// manually so the attempt chain is complete.
    pub async fn fetch(
        client: &reqwest::Client,
        path: &str,
        base_url: &CanonicalUrl,
        opts: &FetchOptions,
    ) -> Result<Resource, FetchError> {
        let mut current = canonical_url::normalize_required(path, Some(base_url))?;
        let mut attempts = Vec::new();
        let mut redirects: u8 = 0;

        loop {
            let start_ms = now_ms();
            let request = client
                .get(current.as_str())
                .header(USER_AGENT, opts.user_agent.as_str())
                .send();

            let outcome = tokio::time::timeout(opts.timeout, request).await;
            let end_ms = now_ms();

            let response = match outcome {
                Err(_elapsed) => {
                    attempts.push(Attempt::timed_out(current.to_string(), start_ms, end_ms));
                    return Err(FetchError::RequestTimeout {
                        url: current.to_string(),
                        timeout_ms: opts.timeout.as_millis() as u64,
                    });
                }
                Ok(Err(source)) => {
                    attempts.push(Attempt::transport_failure(current.to_string(), start_ms, end_ms));
                    return Err(FetchError::FetchFailed {
                        url: current.to_string(),
                        source,
                    });
                }
                Ok(Ok(response)) => response,
            };

            let status = response.status().as_u16();
            attempts.push(Attempt::new(current.to_string(), status, start_ms, end_ms));

            if (300..400).contains(&status) {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(FetchError::MissingLocation {
                        url: current.to_string(),
                        status,
                    })?;

                redirects += 1;
                if redirects > opts.max_redirects {
                    return Err(FetchError::TooManyRedirects {
                        url: current.to_string(),
                        max_redirects: opts.max_redirects,
                    });
                }

                current = canonical_url::normalize_required(location, Some(&current))?;
                continue;
            }

            if !(200..300).contains(&status) {
                return Err(FetchError::HttpError {
                    url: current.to_string(),
                    status,
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body = response
                .bytes()
                .await
                .map_err(|source| FetchError::FetchFailed {
                    url: current.to_string(),
                    source,
                })?
                .to_vec();

            return Ok(Resource::new(current, base_url.clone(), content_type, body, attempts));
        }
    }

    /// Build a Resource from a resolver callable rather than the network.
    /// One-entry attempt chain, no redirects.
    pub fn from_resolver(path: &str, base_url: &CanonicalUrl, resolver: &Resolver) -> Result<Resource, FetchError> {
        let final_url = canonical_url::normalize_required(path, Some(base_url))?;
        let start_ms = now_ms();
        let response = resolver(path);
        let end_ms = now_ms();

        let attempt = Attempt::new(final_url.to_string(), response.status, start_ms, end_ms);

        if !(200..300).contains(&response.status) {
            return Err(FetchError::HttpError {
                url: final_url.to_string(),
                status: response.status,
            });
        }

        Ok(Resource::new(
            final_url,
            base_url.clone(),
            response.content_type,
            response.body,
            vec![attempt],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CanonicalUrl {
        canonical_url::normalize("http://h/", None).unwrap().into_url().unwrap()
    }

    fn html_resource(path: &str, body: &str) -> Resource {
        let final_url = canonical_url::normalize(path, Some(&base())).unwrap().into_url().unwrap();
        Resource::new(
            final_url,
            base(),
            Some("text/html; charset=utf-8".to_string()),
            body.as_bytes().to_vec(),
            vec![Attempt::new(path.to_string(), 200, 0, 1)],
        )
    }

    #[test]
    fn classifies_html_by_content_type() {
        let r = html_resource("/", "<html></html>");
        assert!(r.is_html());
        assert!(!r.is_asset());
    }

    #[test]
    fn text_fails_on_non_html() {
        let final_url = canonical_url::normalize("/logo.png", Some(&base())).unwrap().into_url().unwrap();
        let r = Resource::new(final_url, base(), Some("image/png".into()), vec![1, 2, 3], vec![]);
        assert!(matches!(r.text(), Err(ResourceError::NotHtml(_))));
    }

    #[test]
    fn extract_urls_partitions_relative_and_external() {
        let r = html_resource(
            "/",
            r#"<a href="/about">a</a><a href="https://elsewhere.example/x">e</a>"#,
        );
        let relative = r.relative_urls().unwrap();
        let external = r.external_urls().unwrap();
        assert_eq!(relative.len(), 1);
        assert_eq!(external.len(), 1);
        assert_eq!(relative[0].path(), "/about");
    }

    #[test]
    fn extract_urls_is_memoized() {
        let r = html_resource("/", r#"<a href="/about">a</a>"#);
        let first = r.extract_urls().unwrap() as *const _;
        let second = r.extract_urls().unwrap() as *const _;
        assert_eq!(first, second);
    }

    #[test]
    fn emission_path_for_root_html() {
        let path = Resource::emission_path(Path::new("out"), None, "/", true);
        assert_eq!(path, PathBuf::from("out/index.html"));
    }

    #[test]
    fn emission_path_for_nested_html() {
        let path = Resource::emission_path(Path::new("out"), None, "/foo/bar", true);
        assert_eq!(path, PathBuf::from("out/foo/bar/index.html"));
    }

    #[test]
    fn emission_path_for_asset_with_base_path() {
        let path = Resource::emission_path(Path::new("out"), Some("/app"), "/a/b.png", false);
        assert_eq!(path, PathBuf::from("out/app/a/b.png"));
    }

    #[test]
    fn save_writes_rewritten_html_when_base_path_present() {
        let dir = tempfile::tempdir().unwrap();
        let r = html_resource("/", r#"<a href="/about">a</a>"#);
        let path = r.save(dir.path(), Some("/app")).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, r#"<a href="/app/about">a</a>"#);
    }

    #[test]
    fn save_writes_verbatim_html_without_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let r = html_resource("/", r#"<a href="/about">a</a>"#);
        let path = r.save(dir.path(), None).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, r#"<a href="/about">a</a>"#);
    }
}
