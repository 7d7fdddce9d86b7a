//! Three strategies for acquiring a base origin, unified behind one
//! interface the Crawler is agnostic to.

pub mod handler;
pub mod process;
pub mod resolver;

pub use handler::{Handler, HandlerOrigin, HandlerResponse};
pub use process::ProcessOrigin;
pub use resolver::DUMMY_ORIGIN;

/// `{ origin, alive, teardown }` — the shape shared by all three strategies.
pub enum OriginBinding {
    Handler(HandlerOrigin),
    Process(ProcessOrigin),
    Resolver,
}

impl OriginBinding {
    pub fn origin_url(&self) -> String {
        match self {
            OriginBinding::Handler(h) => h.origin_url(),
            OriginBinding::Process(p) => p.origin_url().to_string(),
            OriginBinding::Resolver => DUMMY_ORIGIN.to_string(),
        }
    }

    pub async fn alive(&mut self) -> bool {
        match self {
            OriginBinding::Handler(h) => h.alive(),
            OriginBinding::Process(p) => p.alive().await,
            OriginBinding::Resolver => true,
        }
    }

    pub async fn teardown(self) {
        match self {
            OriginBinding::Handler(h) => h.teardown().await,
            OriginBinding::Process(p) => p.teardown().await,
            OriginBinding::Resolver => {}
        }
    }
}
