//! The Pattern Registry: a fixed, process-wide table of HTML URL regexes.
//!
//! Both the link extractor and link rewriter consume this table and only
//! this table — a single shared vocabulary is what keeps the two from
//! drifting apart.
//!
//! Some HTML URL scanners are built on stateful, global (`lastIndex`-
//! carrying) regexes, where forgetting to reset state between scans is a
//! classic bug. Rust's `regex` crate has no such concept: every
//! `find_iter`/`captures_iter` call is already a fresh, one-shot scan, so
//! that hazard doesn't arise here — each [`Pattern`] just exposes `find_all`.

use regex::Regex;
use std::sync::OnceLock;

/// One named entry in the registry.
pub struct Pattern {
    pub name: &'static str,
    pub description: &'static str,
    regex: Regex,
    /// Which capture group(s) of `regex` carry the URL/value, in order of
    /// preference — the quoting alternative that actually matched reports
    /// its own group index.
    pub capture_group_indices: &'static [usize],
}

impl Pattern {
    /// Find every match, resolving which capture group fired for each.
    pub fn find_all<'t>(&self, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
        let indices = self.capture_group_indices;
        self.regex.captures_iter(text).filter_map(move |caps| {
            indices
                .iter()
                .find_map(|&i| caps.get(i).map(|m| m.as_str()))
        })
    }

    /// Like [`find_all`] but only yields non-empty values.
    pub fn find_all_nonempty<'t>(&self, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
        self.find_all(text).filter(|s| !s.is_empty())
    }

    /// Like [`find_all`] but also reports the byte span of the captured
    /// group within `text`, so a caller can splice a replacement in
    /// without disturbing the surrounding syntax.
    pub fn find_all_spans<'t>(&self, text: &'t str) -> Vec<(usize, usize, &'t str)> {
        let indices = self.capture_group_indices;
        self.regex
            .captures_iter(text)
            .filter_map(|caps| indices.iter().find_map(|&i| caps.get(i)))
            .map(|m| (m.start(), m.end(), m.as_str()))
            .collect()
    }
}

/// Quoted/single-quoted/bare-word alternation for an attribute value.
/// Produces exactly three capture groups: dq, sq, unquoted.
fn attr_value_alt() -> &'static str {
    r#"(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#
}

fn attr_pattern(tag: &str, attr: &str) -> Regex {
    let pattern = format!(r#"(?i)<{tag}\b[^>]*?\b{attr}\s*=\s*{}"#, attr_value_alt());
    Regex::new(&pattern).expect("pattern registry regex must compile")
}

const DQ_SQ_UNQUOTED: &[usize] = &[1, 2, 3];

struct Registry {
    links: Pattern,
    images: Pattern,
    scripts: Pattern,
    stylesheets: Pattern,
    iframes: Pattern,
    media_src: Pattern,
    source: Pattern,
    track: Pattern,
    embed: Pattern,
    object: Pattern,
    css_urls: Pattern,
    style_tags: Pattern,
    inline_styles: Pattern,
    meta_refresh: Pattern,
    meta_refresh_url: Pattern,
}

fn build_registry() -> Registry {
    Registry {
        links: Pattern {
            name: "LINKS",
            description: "<a href=X>",
            regex: attr_pattern("a", "href"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        images: Pattern {
            name: "IMAGES",
            description: "<img src=X>",
            regex: attr_pattern("img", "src"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        scripts: Pattern {
            name: "SCRIPTS",
            description: "<script src=X>",
            regex: attr_pattern("script", "src"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        stylesheets: Pattern {
            name: "STYLESHEETS",
            description: "<link href=X>",
            regex: attr_pattern("link", "href"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        iframes: Pattern {
            name: "IFRAMES",
            description: "<iframe src=X>",
            regex: attr_pattern("iframe", "src"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        media_src: Pattern {
            name: "MEDIA_SRC",
            description: "<video|audio src=X>",
            regex: attr_pattern("(?:video|audio)", "src"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        source: Pattern {
            name: "SOURCE",
            description: "<source src=X>",
            regex: attr_pattern("source", "src"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        track: Pattern {
            name: "TRACK",
            description: "<track src=X>",
            regex: attr_pattern("track", "src"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        embed: Pattern {
            name: "EMBED",
            description: "<embed src=X>",
            regex: attr_pattern("embed", "src"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        object: Pattern {
            name: "OBJECT",
            description: "<object data=X>",
            regex: attr_pattern("object", "data"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        css_urls: Pattern {
            name: "CSS_URLS",
            description: "url(X) inside CSS",
            regex: Regex::new(&format!(r"(?i)url\(\s*{}\s*\)", attr_value_alt()))
                .expect("pattern registry regex must compile"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        style_tags: Pattern {
            name: "STYLE_TAGS",
            description: "<style>...</style> body",
            regex: Regex::new(r"(?is)<style\b[^>]*>(.*?)</style>")
                .expect("pattern registry regex must compile"),
            capture_group_indices: &[1],
        },
        inline_styles: Pattern {
            name: "INLINE_STYLES",
            description: r#"style="..." attribute value"#,
            regex: Regex::new(&format!(r#"(?i)\bstyle\s*=\s*{}"#, attr_value_alt()))
                .expect("pattern registry regex must compile"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        meta_refresh: Pattern {
            name: "META_REFRESH",
            description: "<meta http-equiv=refresh content=V>",
            regex: Regex::new(&format!(
                r#"(?i)<meta\b[^>]*?\bhttp-equiv\s*=\s*(?:"refresh"|'refresh'|refresh)[^>]*?\bcontent\s*=\s*{}"#,
                attr_value_alt()
            ))
            .expect("pattern registry regex must compile"),
            capture_group_indices: DQ_SQ_UNQUOTED,
        },
        meta_refresh_url: Pattern {
            name: "META_REFRESH_URL",
            description: "url=X inside a refresh's content value",
            regex: Regex::new(r"(?i)url\s*=\s*(\S+)").expect("pattern registry regex must compile"),
            capture_group_indices: &[1],
        },
    }
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(build_registry)
}

pub fn links() -> &'static Pattern {
    &registry().links
}
pub fn images() -> &'static Pattern {
    &registry().images
}
pub fn scripts() -> &'static Pattern {
    &registry().scripts
}
pub fn stylesheets() -> &'static Pattern {
    &registry().stylesheets
}
pub fn iframes() -> &'static Pattern {
    &registry().iframes
}
pub fn media_src() -> &'static Pattern {
    &registry().media_src
}
pub fn source() -> &'static Pattern {
    &registry().source
}
pub fn track() -> &'static Pattern {
    &registry().track
}
pub fn embed() -> &'static Pattern {
    &registry().embed
}
pub fn object() -> &'static Pattern {
    &registry().object
}
pub fn css_urls() -> &'static Pattern {
    &registry().css_urls
}
pub fn style_tags() -> &'static Pattern {
    &registry().style_tags
}
pub fn inline_styles() -> &'static Pattern {
    &registry().inline_styles
}
pub fn meta_refresh() -> &'static Pattern {
    &registry().meta_refresh
}
pub fn meta_refresh_url() -> &'static Pattern {
    &registry().meta_refresh_url
}

/// Every direct-URL pattern (i.e. everything except the CSS/meta chains,
/// which need to be run over an intermediate extracted string — see
/// [`crate::link_extractor`]).
pub fn direct_url_patterns() -> [&'static Pattern; 10] {
    [
        links(),
        images(),
        scripts(),
        stylesheets(),
        iframes(),
        media_src(),
        source(),
        track(),
        embed(),
        object(),
    ]
}
