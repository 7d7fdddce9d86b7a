//! End-to-end crawl scenarios.
//!
//! Plain `#[tokio::test]` functions, one scenario per test, using a
//! resolver callable so no real network or sub-process is needed.

use std::sync::Arc;

use sitecast::config::{DiscoverSpec, RoutesSpec, ServerSpec};
use sitecast::resource::ResolverResponse;
use sitecast::{Crawler, CrawlerConfig};

fn html(body: &str) -> ResolverResponse {
    ResolverResponse {
        status: 200,
        content_type: Some("text/html; charset=utf-8".to_string()),
        body: body.as_bytes().to_vec(),
    }
}

fn not_found() -> ResolverResponse {
    ResolverResponse { status: 404, content_type: None, body: Vec::new() }
}

/// Crawling a single page with no outgoing links yields one resource,
/// saved to `index.html` at the output root.
#[tokio::test]
async fn single_page_site() {
    let resolver = Arc::new(|_path: &str| html("<html><body>hi</body></html>"));

    let config = CrawlerConfig::builder()
        .server(ServerSpec::Resolver(resolver))
        .routes(RoutesSpec::List(vec!["/".to_string()]))
        .build()
        .unwrap();

    let mut crawler = Crawler::new(config);
    crawler.start().await.unwrap();
    crawler.crawl().await.unwrap();

    assert_eq!(crawler.resources().len(), 1);
    assert_eq!(crawler.resources()[0].final_url.path(), "/");

    let dir = tempfile::tempdir().unwrap();
    crawler.resources()[0].save(dir.path(), None).unwrap();
    let written = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert_eq!(written, "<html><body>hi</body></html>");
}

/// A link discovered on the seed page gets crawled too, and the frontier
/// ends up with nothing left pending.
#[tokio::test]
async fn two_page_crawl() {
    let resolver = Arc::new(|path: &str| match path {
        "/" => html(r#"<a href="/about">a</a>"#),
        "/about" => html("<p>ok</p>"),
        _ => not_found(),
    });

    let config = CrawlerConfig::builder()
        .server(ServerSpec::Resolver(resolver))
        .routes(RoutesSpec::List(vec!["/".to_string()]))
        .build()
        .unwrap();

    let mut crawler = Crawler::new(config);
    crawler.start().await.unwrap();
    crawler.crawl().await.unwrap();

    let mut paths: Vec<_> = crawler.resources().iter().map(|r| r.final_url.path().to_string()).collect();
    paths.sort();
    assert_eq!(paths, vec!["/", "/about"]);

    let stats = crawler.frontier().stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.crawled, 2);
    assert_eq!(stats.failed, 0);
}

/// A link to a different host is extracted but never enters the frontier.
#[tokio::test]
async fn external_link_is_not_crawled() {
    let resolver = Arc::new(|_path: &str| html(r#"<a href="https://elsewhere.example/x">e</a>"#));

    let config = CrawlerConfig::builder()
        .server(ServerSpec::Resolver(resolver))
        .routes(RoutesSpec::List(vec!["/".to_string()]))
        .build()
        .unwrap();

    let mut crawler = Crawler::new(config);
    crawler.start().await.unwrap();
    crawler.crawl().await.unwrap();

    assert_eq!(crawler.resources().len(), 1);
    let external = crawler.resources()[0].extract_urls().unwrap();
    assert!(external.iter().any(|u| u.host() == Some("elsewhere.example")));
    assert!(!crawler.frontier().known(external.iter().next().unwrap()));
}

/// A chain of redirects is followed manually and every hop is recorded
/// as an attempt. Driven over a real loopback HTTP connection (an
/// in-process handler bound to an ephemeral port) rather than a
/// resolver, so `Resource::fetch`'s redirect-following is actually
/// exercised.
#[tokio::test]
async fn redirect_chain_with_attempts() {
    use sitecast::origin::{Handler, HandlerOrigin, HandlerResponse};
    use sitecast::resource::{FetchOptions, Resource};

    let handler: Handler = Arc::new(|path: &str| match path {
        "/a" => HandlerResponse { status: 301, location: Some("/b".into()), ..Default::default() },
        "/b" => HandlerResponse { status: 301, location: Some("/c".into()), ..Default::default() },
        "/c" => HandlerResponse {
            status: 200,
            content_type: Some("text/html".to_string()),
            body: b"<p>done</p>".to_vec(),
            ..Default::default()
        },
        _ => HandlerResponse { status: 404, ..Default::default() },
    });

    let origin = HandlerOrigin::bind(handler).await.unwrap();
    let base_url = sitecast::canonical_url::normalize(&origin.origin_url(), None)
        .unwrap()
        .into_url()
        .unwrap();
    let client = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build().unwrap();

    let resource = Resource::fetch(&client, "/a", &base_url, &FetchOptions::default()).await.unwrap();

    assert_eq!(resource.final_url.path(), "/c");
    assert_eq!(resource.attempts.len(), 3);
    let statuses: Vec<u16> = resource.attempts.iter().map(|a| a.status_code).collect();
    assert_eq!(statuses, vec![301, 301, 200]);

    origin.teardown().await;
}

/// A deployment base path is prepended to same-origin links only; external
/// and non-http links pass through untouched.
#[test]
fn base_path_rewrite() {
    use sitecast::canonical_url;
    use sitecast::link_rewriter::rewrite;

    let current = canonical_url::normalize("http://h/", None).unwrap().into_url().unwrap();
    let html_in = r#"<a href="/x?q=1#h">x</a><a href="https://elsewhere.example/y">e</a><a href="mailto:a@b.com">m</a>"#;
    let out = rewrite(html_in, &current, "/app");

    assert!(out.contains(r#"<a href="/app/x?q=1#h">x</a>"#));
    assert!(out.contains(r#"<a href="https://elsewhere.example/y">e</a>"#));
    assert!(out.contains(r#"<a href="mailto:a@b.com">m</a>"#));
}

/// One seed returning a server error doesn't stop the rest of the crawl;
/// it's recorded as failed and the crawl finishes.
#[tokio::test]
async fn fetch_failure_is_non_fatal() {
    let resolver = Arc::new(|path: &str| match path {
        "/a" => ResolverResponse { status: 500, content_type: None, body: Vec::new() },
        "/b" => html("<p>ok</p>"),
        _ => not_found(),
    });

    let config = CrawlerConfig::builder()
        .server(ServerSpec::Resolver(resolver))
        .routes(RoutesSpec::List(vec!["/a".to_string(), "/b".to_string()]))
        .discover(DiscoverSpec::Disabled)
        .build()
        .unwrap();

    let mut crawler = Crawler::new(config);
    crawler.start().await.unwrap();
    crawler.crawl().await.unwrap();

    let stats = crawler.frontier().stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.crawled, 1);
    assert_eq!(crawler.statistics().error_count, 1);
}

/// With discovery disabled, a crawl fetches exactly the seed set and
/// ignores any links it finds along the way.
#[tokio::test]
async fn discover_disabled_only_fetches_seeds() {
    let resolver = Arc::new(|_path: &str| html(r#"<a href="/unseen">u</a>"#));

    let config = CrawlerConfig::builder()
        .server(ServerSpec::Resolver(resolver))
        .routes(RoutesSpec::List(vec!["/".to_string()]))
        .discover(DiscoverSpec::Disabled)
        .build()
        .unwrap();

    let mut crawler = Crawler::new(config);
    crawler.start().await.unwrap();
    crawler.crawl().await.unwrap();

    assert_eq!(crawler.resources().len(), 1);
    let dummy_origin = sitecast::canonical_url::normalize(sitecast::origin::DUMMY_ORIGIN, None)
        .unwrap()
        .into_url()
        .unwrap();
    let unseen = sitecast::canonical_url::normalize("/unseen", Some(&dummy_origin)).unwrap().into_url().unwrap();
    assert!(!crawler.frontier().known(&unseen));
}

/// A pre-registered bundle path is never added to the frontier, even when
/// a crawled page links to it.
#[tokio::test]
async fn bundle_paths_are_never_discovered() {
    use sitecast::config::BundleSpec;

    let resolver = Arc::new(|_path: &str| html(r#"<a href="/bundle.js">b</a>"#));

    let config = CrawlerConfig::builder()
        .server(ServerSpec::Resolver(resolver))
        .routes(RoutesSpec::List(vec!["/".to_string()]))
        .bundle(
            "/bundle.js",
            BundleSpec { body: b"console.log(1)".to_vec(), content_type: "application/javascript".into(), source_map: None },
        )
        .build()
        .unwrap();

    let mut crawler = Crawler::new(config);
    crawler.start().await.unwrap();
    crawler.crawl().await.unwrap();

    assert_eq!(crawler.resources().len(), 1);
}

/// A registered bundle reaches disk (body plus `.map` sidecar) even when
/// no crawled page ever links to it, and is reported as crawled without
/// ever being fetched.
#[tokio::test]
async fn unlinked_bundle_is_still_emitted() {
    use sitecast::config::BundleSpec;

    let resolver = Arc::new(|_path: &str| html("<p>no links here</p>"));

    let config = CrawlerConfig::builder()
        .server(ServerSpec::Resolver(resolver))
        .routes(RoutesSpec::List(vec!["/".to_string()]))
        .bundle(
            "/app.js",
            BundleSpec {
                body: b"console.log(2)".to_vec(),
                content_type: "application/javascript".into(),
                source_map: Some(b"{\"version\":3}".to_vec()),
            },
        )
        .build()
        .unwrap();

    let mut crawler = Crawler::new(config);
    crawler.start().await.unwrap();
    crawler.crawl().await.unwrap();
    crawler.stop().await;

    let dummy_origin = sitecast::canonical_url::normalize(sitecast::origin::DUMMY_ORIGIN, None)
        .unwrap()
        .into_url()
        .unwrap();
    let bundle_url = sitecast::canonical_url::normalize("/app.js", Some(&dummy_origin)).unwrap().into_url().unwrap();
    assert!(crawler.frontier().is_crawled(&bundle_url));

    let dir = tempfile::tempdir().unwrap();
    let written = crawler.save_all(dir.path()).unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(std::fs::read(dir.path().join("app.js")).unwrap(), b"console.log(2)");
    assert_eq!(std::fs::read(dir.path().join("app.js.map")).unwrap(), b"{\"version\":3}");
}
