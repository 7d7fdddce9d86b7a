//! Prepend a deployment base-path to every same-origin URL in an HTML
//! document.
//!
//! Shaped after `link_rewriter/mod.rs` and `page_extractor/link_rewriter.rs`
//! (an `lol_html` streaming rewrite that substitutes a local-mirror-relative
//! path). Neither `lol_html` nor `scraper` exposes which quoting
//! alternative fired for an attribute, or lets the same pass walk into
//! `style=""` text and `url()` CSS content — so this rewrite consumes the
//! same [`crate::patterns`] registry as the extractor directly via
//! `regex`, splicing only the URL-carrying substring of each match and
//! leaving everything else byte-identical.

use crate::canonical_url::CanonicalUrl;
use crate::patterns;

/// Rewrite every same-origin URL in `html` to be prefixed with
/// `base_path`. A no-op (byte-identical output) when `base_path` is empty
/// or `/`.
pub fn rewrite(html: &str, current_url: &CanonicalUrl, base_path: &str) -> String {
    let Some(base_path) = normalize_base_path(base_path) else {
        return html.to_string();
    };

    let mut replacements: Vec<(usize, usize, String)> = Vec::new();

    for pattern in patterns::direct_url_patterns() {
        for (start, end, raw) in pattern.find_all_spans(html) {
            if let Some(new) = rewrite_url(raw, current_url, &base_path) {
                replacements.push((start, end, new));
            }
        }
    }

    for (style_start, _, body) in patterns::style_tags().find_all_spans(html) {
        for (rel_start, rel_end, raw) in patterns::css_urls().find_all_spans(body) {
            if let Some(new) = rewrite_url(raw, current_url, &base_path) {
                replacements.push((style_start + rel_start, style_start + rel_end, new));
            }
        }
    }

    for (inline_start, _, value) in patterns::inline_styles().find_all_spans(html) {
        for (rel_start, rel_end, raw) in patterns::css_urls().find_all_spans(value) {
            if let Some(new) = rewrite_url(raw, current_url, &base_path) {
                replacements.push((inline_start + rel_start, inline_start + rel_end, new));
            }
        }
    }

    for (content_start, _, content) in patterns::meta_refresh().find_all_spans(html) {
        for (rel_start, rel_end, raw) in patterns::meta_refresh_url().find_all_spans(content) {
            if let Some(new) = rewrite_url(raw, current_url, &base_path) {
                replacements.push((content_start + rel_start, content_start + rel_end, new));
            }
        }
    }

    apply_replacements(html, replacements)
}

/// Decide whether `raw` should be rewritten, and return its replacement
/// text if so: `base_path` + resolved path, with the original query and
/// fragment preserved verbatim — unlike extraction, rewriting must not
/// sort or strip them.
fn rewrite_url(raw: &str, current: &CanonicalUrl, base_path: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let resolved = current.as_url().join(trimmed).ok()?;

    let same_origin = resolved.scheme() == current.scheme()
        && resolved.host_str() == current.host()
        && resolved.port_or_known_default() == current.as_url().port_or_known_default();
    if !same_origin {
        return None;
    }

    let mut out = String::with_capacity(base_path.len() + resolved.path().len());
    out.push_str(base_path);
    out.push_str(resolved.path());
    if let Some(q) = resolved.query() {
        out.push('?');
        out.push_str(q);
    }
    if let Some(f) = resolved.fragment() {
        out.push('#');
        out.push_str(f);
    }
    Some(out)
}

fn apply_replacements(html: &str, mut replacements: Vec<(usize, usize, String)>) -> String {
    replacements.sort_by_key(|&(start, _, _)| start);
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for (start, end, new) in replacements {
        if start < cursor {
            continue;
        }
        out.push_str(&html[cursor..start]);
        out.push_str(&new);
        cursor = end;
    }
    out.push_str(&html[cursor..]);
    out
}

/// `""` and `"/"` mean "absent"; otherwise force a leading `/` and strip
/// any trailing `/`.
pub(crate) fn normalize_base_path(base_path: &str) -> Option<String> {
    let trimmed = base_path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return None;
    }
    let mut owned = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    while owned.len() > 1 && owned.ends_with('/') {
        owned.pop();
    }
    Some(owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_url;

    fn current() -> CanonicalUrl {
        canonical_url::normalize("http://h/", None)
            .unwrap()
            .into_url()
            .unwrap()
    }

    #[test]
    fn prepends_base_path_preserving_query_and_fragment() {
        let html = r#"<a href="/x?q=1#h">link</a>"#;
        let out = rewrite(html, &current(), "/app");
        assert_eq!(out, r#"<a href="/app/x?q=1#h">link</a>"#);
    }

    #[test]
    fn leaves_external_links_unchanged() {
        let html = r#"<a href="https://elsewhere.example/y">e</a>"#;
        let out = rewrite(html, &current(), "/app");
        assert_eq!(out, html);
    }

    #[test]
    fn leaves_mailto_unchanged() {
        let html = r#"<a href="mailto:a@b.com">mail</a>"#;
        let out = rewrite(html, &current(), "/app");
        assert_eq!(out, html);
    }

    #[test]
    fn empty_base_path_is_byte_identical_noop() {
        let html = r#"<a href="/x" class="y">link</a><img src='/z'>"#;
        assert_eq!(rewrite(html, &current(), ""), html);
        assert_eq!(rewrite(html, &current(), "/"), html);
    }

    #[test]
    fn preserves_surrounding_attribute_syntax() {
        let html = r#"<a class="btn" href='/x' target="_blank">go</a>"#;
        let out = rewrite(html, &current(), "/app");
        assert_eq!(out, r#"<a class="btn" href='/app/x' target="_blank">go</a>"#);
    }

    #[test]
    fn rewrites_css_url_inside_style_tag() {
        let html = "<style>body{background:url(/bg.png)}</style>";
        let out = rewrite(html, &current(), "/app");
        assert_eq!(out, "<style>body{background:url(/app/bg.png)}</style>");
    }

    #[test]
    fn rewrites_inline_style_url() {
        let html = r#"<div style="background:url(/x.png)"></div>"#;
        let out = rewrite(html, &current(), "/app");
        assert_eq!(out, r#"<div style="background:url(/app/x.png)"></div>"#);
    }

    #[test]
    fn rewrites_meta_refresh_preserving_delay_prefix() {
        let html = r#"<meta http-equiv="refresh" content="5;url=/next">"#;
        let out = rewrite(html, &current(), "/app");
        assert_eq!(out, r#"<meta http-equiv="refresh" content="5;url=/app/next">"#);
    }

    #[test]
    fn base_path_is_normalized() {
        let html = r#"<a href="/x">a</a>"#;
        assert_eq!(rewrite(html, &current(), "app/"), rewrite(html, &current(), "/app"));
    }
}
