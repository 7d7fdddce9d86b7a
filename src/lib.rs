pub mod attempt;
pub mod bundle_resource;
pub mod canonical_url;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod frontier;
pub mod link_extractor;
pub mod link_rewriter;
pub mod origin;
pub mod patterns;
pub mod resource;

pub use attempt::Attempt;
pub use bundle_resource::BundleResource;
pub use canonical_url::{CanonicalUrl, Normalized};
pub use config::{BundleSpec, CrawlerConfig, DiscoverSpec, DiscoveryDecision, RoutesSpec, ServerSpec};
pub use crawler::{Crawler, Statistics};
pub use error::{CrawlerError, FetchError, ResourceError, UrlError};
pub use frontier::{Frontier, FrontierOpError, FrontierStats};
pub use origin::{Handler, HandlerResponse, OriginBinding};
pub use resource::{FetchOptions, Resolver, ResolverResponse, Resource};
