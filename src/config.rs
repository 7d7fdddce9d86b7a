//! The Config boundary and its builder — the struct the Crawler consumes.
//!
//! Shaped after `config::builder::CrawlConfigBuilder`, simplified from its
//! typestate builder into a plain `Option`-field builder with a
//! validating `build()`; see DESIGN.md for the rationale.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::canonical_url::CanonicalUrl;
use crate::origin::Handler;
use crate::resource::Resolver;

/// Where the Crawler gets its base origin from.
pub enum ServerSpec {
    /// An in-process request handler, bound to an ephemeral port.
    Handler(Handler),
    /// An already-running origin — no process is launched or torn down;
    /// the crawler just fetches against it.
    External(String),
    /// A sub-process origin: an argv to launch, and the address the
    /// caller expects it to come up on. Readiness is bounded by
    /// `CrawlerConfig::server_timeout`.
    Process { argv: Vec<String>, origin: String },
    /// A synchronous resolver callable; no network at all.
    Resolver(Resolver),
}

/// The seed list the crawl starts from.
pub enum RoutesSpec {
    List(Vec<String>),
    Callable(Arc<dyn Fn() -> Vec<String> + Send + Sync>),
}

/// Whether, and how, to discover new URLs during the HTML post-processing
/// step.
pub enum DiscoverSpec {
    Disabled,
    Enabled,
    Filtered(Arc<dyn Fn(&CanonicalUrl) -> DiscoveryDecision + Send + Sync>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryDecision {
    Crawl,
    Ignore,
}

/// A pre-built bundle: never fetched over the network, registered so its
/// path is skipped during discovery and so it can be pre-seeded via
/// `Crawler::add_visited_resource`.
#[derive(Debug, Clone)]
pub struct BundleSpec {
    pub body: Vec<u8>,
    pub content_type: String,
    pub source_map: Option<Vec<u8>>,
}

pub struct CrawlerConfig {
    pub server: ServerSpec,
    pub routes: RoutesSpec,
    pub discover: DiscoverSpec,
    pub bundles: HashMap<String, BundleSpec>,
    pub base_path: Option<String>,

    pub max_resources: usize,
    pub request_timeout: Duration,
    pub max_redirects: u8,
    pub user_agent: String,
    pub concurrency: usize,
    pub server_timeout: Duration,
}

impl CrawlerConfig {
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct CrawlerConfigBuilder {
    server: Option<ServerSpec>,
    routes: Option<RoutesSpec>,
    discover: Option<DiscoverSpec>,
    bundles: HashMap<String, BundleSpec>,
    base_path: Option<String>,
    max_resources: Option<usize>,
    request_timeout: Option<Duration>,
    max_redirects: Option<u8>,
    user_agent: Option<String>,
    concurrency: Option<usize>,
    server_timeout: Option<Duration>,
}

impl CrawlerConfigBuilder {
    pub fn server(mut self, server: ServerSpec) -> Self {
        self.server = Some(server);
        self
    }

    pub fn routes(mut self, routes: RoutesSpec) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn discover(mut self, discover: DiscoverSpec) -> Self {
        self.discover = Some(discover);
        self
    }

    pub fn bundle(mut self, path: impl Into<String>, spec: BundleSpec) -> Self {
        self.bundles.insert(path.into(), spec);
        self
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn max_resources(mut self, max_resources: usize) -> Self {
        self.max_resources = Some(max_resources);
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    pub fn max_redirects(mut self, max_redirects: u8) -> Self {
        self.max_redirects = Some(max_redirects);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn server_timeout(mut self, server_timeout: Duration) -> Self {
        self.server_timeout = Some(server_timeout);
        self
    }

    pub fn build(self) -> Result<CrawlerConfig> {
        let Some(server) = self.server else {
            bail!("CrawlerConfig requires a server (handler, process, or resolver)");
        };

        Ok(CrawlerConfig {
            server,
            routes: self.routes.unwrap_or(RoutesSpec::List(Vec::new())),
            discover: self.discover.unwrap_or(DiscoverSpec::Enabled),
            bundles: self.bundles,
            base_path: self.base_path,
            max_resources: self.max_resources.unwrap_or(1000),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_millis(10_000)),
            max_redirects: self.max_redirects.unwrap_or(5),
            user_agent: self.user_agent.unwrap_or_else(|| format!("sitecast/{}", env!("CARGO_PKG_VERSION"))),
            concurrency: self.concurrency.unwrap_or(8),
            server_timeout: self.server_timeout.unwrap_or(Duration::from_secs(30)),
        })
    }
}
