//! Harvest every URL referenced by an HTML document.
//!
//! Shaped after `link_rewriter::extract_links_from_html` (scraper-based
//! extraction), generalized here to walk all fifteen pattern-registry
//! entries instead of a handful of CSS selectors.

use std::collections::HashSet;

use crate::canonical_url::{self, CanonicalUrl, Normalized};
use crate::patterns;

/// Extract every URL reachable from `html`, resolved against `base`.
///
/// Strings that the normalizer rejects (sentinel or error) are silently
/// dropped — a single malformed `href` must not abort extraction for the
/// rest of the document. Results are de-duplicated by canonical URL string.
pub fn extract(html: &str, base: &CanonicalUrl) -> HashSet<CanonicalUrl> {
    let mut found = HashSet::new();

    for pattern in patterns::direct_url_patterns() {
        for raw in pattern.find_all_nonempty(html) {
            push_normalized(&mut found, raw, base);
        }
    }

    for style_body in patterns::style_tags().find_all(html) {
        for raw in patterns::css_urls().find_all_nonempty(style_body) {
            push_normalized(&mut found, raw, base);
        }
    }

    for inline in patterns::inline_styles().find_all(html) {
        for raw in patterns::css_urls().find_all_nonempty(inline) {
            push_normalized(&mut found, raw, base);
        }
    }

    for content in patterns::meta_refresh().find_all(html) {
        for raw in patterns::meta_refresh_url().find_all_nonempty(content) {
            push_normalized(&mut found, raw, base);
        }
    }

    found
}

fn push_normalized(found: &mut HashSet<CanonicalUrl>, raw: &str, base: &CanonicalUrl) {
    match canonical_url::normalize(raw, Some(base)) {
        Ok(Normalized::Url(url)) => {
            found.insert(url);
        }
        Ok(Normalized::Skip) | Err(_) => {}
    }
}
