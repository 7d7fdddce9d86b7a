//! The CLI surface: a `clap`-derived argument struct that produces a
//! [`CrawlerConfig`] and nothing more.
//!
//! Shaped after `sitebookify`'s `cli.rs`: `#[derive(Parser)]`, one flag
//! per knob with a doc-comment description and a `default_value_t`.

use clap::Parser;

use crate::config::{CrawlerConfig, DiscoverSpec, RoutesSpec, ServerSpec};

#[derive(Debug, Parser)]
#[command(author, version, about = "Crawl a site and emit a browseable directory tree.")]
pub struct Cli {
    /// Origin to crawl (e.g. http://localhost:3000).
    #[arg(long)]
    pub origin: String,

    /// Seed paths to start crawling from (repeatable).
    #[arg(long = "seed", default_value = "/")]
    pub seeds: Vec<String>,

    /// Output directory for the emitted site.
    #[arg(long, default_value = "out")]
    pub out: String,

    /// Deployment sub-path prefix applied to internal links.
    #[arg(long)]
    pub base_path: Option<String>,

    /// Maximum number of resources to fetch before stopping.
    #[arg(long, default_value_t = 1000)]
    pub max_resources: usize,

    /// Per-request timeout, in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Maximum redirects to follow per fetch.
    #[arg(long, default_value_t = 5)]
    pub max_redirects: u8,

    /// Maximum concurrent in-flight fetches.
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,

    /// Disable link discovery; only the given seeds are fetched.
    #[arg(long, default_value_t = false)]
    pub no_discover: bool,
}

impl Cli {
    pub fn into_config(self) -> anyhow::Result<CrawlerConfig> {
        let discover = if self.no_discover { DiscoverSpec::Disabled } else { DiscoverSpec::Enabled };

        let mut builder = CrawlerConfig::builder()
            .server(ServerSpec::External(self.origin))
            .routes(RoutesSpec::List(self.seeds))
            .discover(discover)
            .max_resources(self.max_resources)
            .request_timeout(std::time::Duration::from_millis(self.request_timeout_ms))
            .max_redirects(self.max_redirects)
            .concurrency(self.concurrency);

        if let Some(base_path) = self.base_path {
            builder = builder.base_path(base_path);
        }

        builder.build()
    }
}
