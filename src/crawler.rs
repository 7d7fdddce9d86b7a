//! The orchestrator: owns the frontier, the resource collection, the
//! origin binding, and statistics.
//!
//! Shaped after `crawl_engine/orchestrator.rs` and `crawl_engine/core.rs`,
//! generalized from "launch browser, navigate, extract" into a
//! frontier-drain loop. Bounded concurrency follows the same
//! `FuturesUnordered` + capped in-flight count shape used for
//! `LinkRewriter::rewrite_semaphore`.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use futures::stream::{FuturesUnordered, StreamExt};

use crate::attempt::Attempt;
use crate::bundle_resource::BundleResource;
use crate::canonical_url::{self, CanonicalUrl};
use crate::config::{BundleSpec, CrawlerConfig, DiscoverSpec, DiscoveryDecision, RoutesSpec, ServerSpec};
use crate::error::CrawlerError;
use crate::frontier::Frontier;
use crate::origin::{HandlerOrigin, OriginBinding, ProcessOrigin, DUMMY_ORIGIN};
use crate::resource::{FetchOptions, Resource};

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrawlerState {
    NotStarted,
    Started,
    Crawling,
    Stopped,
}

/// Counts and timings the crawl reports.
#[derive(Debug, Default, Clone)]
pub struct Statistics {
    pub success_count: usize,
    pub error_count: usize,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
}

enum FetchOutcome {
    Success(CanonicalUrl, Resource),
    Failure(CanonicalUrl, String),
}

pub struct Crawler {
    config: CrawlerConfig,
    client: reqwest::Client,
    frontier: Frontier,
    resources: Vec<Resource>,
    bundle_resources: Vec<BundleResource>,
    base_url: Option<CanonicalUrl>,
    origin_binding: Option<OriginBinding>,
    state: CrawlerState,
    crawled_once: bool,
    stats: Statistics,
}

impl Crawler {
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("reqwest client must build"),
            frontier: Frontier::new(),
            resources: Vec::new(),
            bundle_resources: Vec::new(),
            base_url: None,
            origin_binding: None,
            state: CrawlerState::NotStarted,
            crawled_once: false,
            stats: Statistics::default(),
        }
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn bundle_resources(&self) -> &[BundleResource] {
        &self.bundle_resources
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Write every crawled resource and bundle to disk under `dest_root`,
    /// honoring `config.base_path` for HTML link rewriting. Bundles are
    /// never rewritten.
    pub fn save_all(&self, dest_root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let base_path = self.config.base_path.as_deref();
        let mut written = Vec::with_capacity(self.resources.len() + self.bundle_resources.len());
        for resource in &self.resources {
            written.push(resource.save(dest_root, base_path)?);
        }
        for bundle in &self.bundle_resources {
            written.push(bundle.save(dest_root)?);
        }
        Ok(written)
    }

    /// Insert a pre-built Resource (e.g. a bundle) directly into the
    /// crawled set. Only valid before `start`.
    pub fn add_visited_resource(&mut self, url: &str, resource: Resource) -> Result<(), CrawlerError> {
        if self.state != CrawlerState::NotStarted {
            return Err(CrawlerError::AlreadyStarted);
        }
        // Before `start`, the real origin may not exist yet (e.g. an
        // unbound in-process handler); fall back to the resolver dummy so
        // pre-seeded paths still resolve to a canonical URL. Path-based
        // bundle-skip comparisons in `post_process_html` don't depend on
        // which origin a URL carries.
        let fallback_base = canonical_url::normalize_required(DUMMY_ORIGIN, None).expect("dummy origin is valid");
        let base = self.base_url.as_ref().unwrap_or(&fallback_base);
        let canonical = canonical_url::normalize_required(url, Some(base))?;
        self.frontier.discover(canonical.clone());
        self.frontier
            .mark_crawled(&canonical)
            .expect("just discovered, so must be pending");
        self.resources.push(resource);
        Ok(())
    }

    /// Acquire the origin, seed the frontier, record `start_time`.
    pub async fn start(&mut self) -> Result<(), CrawlerError> {
        if self.state != CrawlerState::NotStarted {
            return Err(CrawlerError::AlreadyStarted);
        }

        let server_timeout = self.config.server_timeout;

        let origin_str = match &self.config.server {
            ServerSpec::Resolver(_) => DUMMY_ORIGIN.to_string(),
            ServerSpec::External(origin) => origin.clone(),
            ServerSpec::Handler(handler) => {
                let binding = tokio::time::timeout(server_timeout, HandlerOrigin::bind(handler.clone()))
                    .await
                    .map_err(|_| CrawlerError::BootTimeout(server_timeout))??;
                let url = binding.origin_url();
                self.origin_binding = Some(OriginBinding::Handler(binding));
                url
            }
            ServerSpec::Process { argv, origin } => {
                let binding = ProcessOrigin::spawn(argv, origin.clone(), server_timeout).await?;
                let url = binding.origin_url().to_string();
                self.origin_binding = Some(OriginBinding::Process(binding));
                url
            }
        };

        let base_url = canonical_url::normalize_required(&origin_str, None)?;

        let seeds = match &self.config.routes {
            RoutesSpec::List(list) => list.clone(),
            RoutesSpec::Callable(f) => f(),
        };
        for seed in seeds {
            if let Ok(url) = canonical_url::normalize_required(&seed, Some(&base_url)) {
                self.frontier.discover(url);
            }
        }

        self.seed_bundles(&base_url)?;

        self.base_url = Some(base_url);
        self.stats.start_time_ms = now_ms();
        self.state = CrawlerState::Started;
        Ok(())
    }

    /// Turn every configured bundle into a `BundleResource`, marking its
    /// path crawled up front so it's never rediscovered from HTML.
    fn seed_bundles(&mut self, base_url: &CanonicalUrl) -> Result<(), CrawlerError> {
        let bundles: Vec<(String, BundleSpec)> =
            self.config.bundles.iter().map(|(path, spec)| (path.clone(), spec.clone())).collect();

        for (path, spec) in bundles {
            let canonical = canonical_url::normalize_required(&path, Some(base_url))?;
            let resource = Resource::new(
                canonical.clone(),
                base_url.clone(),
                Some(spec.content_type.clone()),
                spec.body.clone(),
                vec![Attempt::new(path.clone(), 200, 0, 0)],
            );
            self.frontier.discover(canonical.clone());
            self.frontier.mark_crawled(&canonical).expect("just discovered, so must be pending");
            self.bundle_resources.push(BundleResource::new(resource, spec.source_map.clone()));
        }
        Ok(())
    }

    /// The main crawl loop: pop pending URLs, fetch them (bounded
    /// concurrency), mark crawled/failed, discover new links from HTML.
    pub async fn crawl(&mut self) -> Result<(), CrawlerError> {
        if self.state == CrawlerState::NotStarted {
            return Err(CrawlerError::NotStarted);
        }
        if self.crawled_once {
            return Err(CrawlerError::AlreadyCrawling);
        }
        self.crawled_once = true;
        self.state = CrawlerState::Crawling;

        let concurrency = self.config.concurrency.max(1);
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < concurrency
                && self.resources.len() + in_flight.len() < self.config.max_resources
            {
                let Some(next) = self.frontier.next_pending() else { break };
                in_flight.push(self.fetch_task(next));
            }

            if in_flight.is_empty() {
                break;
            }

            if let Some(outcome) = in_flight.next().await {
                self.apply_outcome(outcome)?;
            }

            if let Some(binding) = self.origin_binding.as_mut() {
                if !binding.alive().await {
                    return Err(CrawlerError::ServerDied);
                }
            }

            if self.resources.len() >= self.config.max_resources {
                break;
            }
        }

        self.state = CrawlerState::Started;
        Ok(())
    }

    fn fetch_task(&self, url: CanonicalUrl) -> impl std::future::Future<Output = FetchOutcome> + 'static {
        let client = self.client.clone();
        let base_url = self.base_url.clone().expect("base_url set by start()");
        let opts = FetchOptions {
            timeout: self.config.request_timeout,
            max_redirects: self.config.max_redirects,
            user_agent: self.config.user_agent.clone(),
        };
        let resolver = match &self.config.server {
            ServerSpec::Resolver(r) => Some(r.clone()),
            _ => None,
        };
        let requested = url.clone();

        async move {
            let result = match resolver {
                Some(resolver) => {
                    let mut path = requested.path().to_string();
                    if let Some(q) = requested.query() {
                        path.push('?');
                        path.push_str(q);
                    }
                    Resource::from_resolver(&path, &base_url, &resolver).map_err(|e| e.to_string())
                }
                None => Resource::fetch(&client, requested.as_str(), &base_url, &opts)
                    .await
                    .map_err(|e| e.to_string()),
            };

            match result {
                Ok(resource) => FetchOutcome::Success(requested, resource),
                Err(message) => FetchOutcome::Failure(requested, message),
            }
        }
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) -> Result<(), CrawlerError> {
        match outcome {
            FetchOutcome::Success(requested, resource) => {
                let _ = self.frontier.mark_crawled(&requested);
                self.stats.success_count += 1;
                if resource.is_html() {
                    self.post_process_html(&resource);
                }
                self.resources.push(resource);
            }
            FetchOutcome::Failure(requested, message) => {
                if self.frontier.is_pending(&requested) {
                    let _ = self.frontier.mark_failed(&requested);
                }
                self.stats.error_count += 1;
                log::warn!("fetch failed for {requested}: {message}");
            }
        }
        Ok(())
    }

    /// For each relative URL in an HTML resource, discover it unless it's
    /// a bundle path or the discovery filter says to ignore it.
    fn post_process_html(&mut self, resource: &Resource) {
        if matches!(self.config.discover, DiscoverSpec::Disabled) {
            return;
        }

        let Ok(relative) = resource.relative_urls() else { return };

        for url in relative {
            if self.config.bundles.contains_key(url.path()) {
                continue;
            }
            if let DiscoverSpec::Filtered(filter) = &self.config.discover {
                if filter(&url) == DiscoveryDecision::Ignore {
                    continue;
                }
            }
            if !self.frontier.known(&url) {
                self.frontier.discover(url);
            }
        }
    }

    /// Tear down the origin binding (if any) and freeze statistics.
    /// Idempotent.
    pub async fn stop(&mut self) {
        if self.state == CrawlerState::Stopped {
            return;
        }
        if let Some(binding) = self.origin_binding.take() {
            binding.teardown().await;
        }
        self.stats.end_time_ms = now_ms();
        self.state = CrawlerState::Stopped;
    }
}
