//! In-process origin binding: a caller-supplied handler bound to an
//! ephemeral loopback port.
//!
//! Built on `hyper`'s low-level server API (`service_fn` + `http1::Builder`),
//! the crate family `sitebookify`'s axum/hyper stack points at.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};

/// Upper bound on how long `teardown` waits for in-flight connections to
/// finish draining before giving up on them.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A synthetic HTTP response returned by a [`Handler`].
#[derive(Debug, Clone, Default)]
pub struct HandlerResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

/// A caller-supplied request handler: request path in, response out.
pub type Handler = Arc<dyn Fn(&str) -> HandlerResponse + Send + Sync>;

/// A running in-process server bound to an ephemeral port.
pub struct HandlerOrigin {
    addr: SocketAddr,
    server_task: JoinHandle<()>,
    shutdown: tokio::sync::watch::Sender<bool>,
    connections: Arc<Mutex<JoinSet<()>>>,
}

impl HandlerOrigin {
    pub async fn bind(handler: Handler) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let connections = Arc::new(Mutex::new(JoinSet::new()));
        let connections_for_task = connections.clone();

        let server_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        let io = TokioIo::new(stream);
                        let handler = handler.clone();
                        let connection = async move {
                            let service = service_fn(move |req: Request<Incoming>| {
                                let handler = handler.clone();
                                async move {
                                    let path = req.uri().path().to_string();
                                    let resp = handler(&path);
                                    let mut builder = Response::builder().status(resp.status);
                                    if let Some(ct) = resp.content_type {
                                        builder = builder.header("content-type", ct);
                                    }
                                    if let Some(location) = resp.location {
                                        builder = builder.header("location", location);
                                    }
                                    let body = Full::new(Bytes::from(resp.body));
                                    Ok::<_, Infallible>(builder.body(body).unwrap())
                                }
                            });
                            let _ = hyper::server::conn::http1::Builder::new()
                                .serve_connection(io, service)
                                .await;
                        };
                        connections_for_task.lock().expect("connections mutex poisoned").spawn(connection);
                    }
                }
            }
        });

        Ok(Self { addr, server_task, shutdown: shutdown_tx, connections })
    }

    pub fn origin_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn alive(&self) -> bool {
        !self.server_task.is_finished()
    }

    /// Stop accepting new connections, then wait (bounded by
    /// `DRAIN_TIMEOUT`) for every in-flight connection task to finish
    /// before returning.
    pub async fn teardown(self) {
        let _ = self.shutdown.send(true);
        self.server_task.abort();
        let _ = self.server_task.await;

        let mut connections =
            std::mem::take(&mut *self.connections.lock().expect("connections mutex poisoned"));
        let drain = async {
            while connections.join_next().await.is_some() {}
        };
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            log::warn!("timed out draining in-flight connections during teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn teardown_waits_for_in_flight_connection() {
        let origin = HandlerOrigin::bind(Arc::new(|_path| HandlerResponse {
            status: 200,
            content_type: Some("text/plain".into()),
            location: None,
            body: b"hi".to_vec(),
        }))
        .await
        .unwrap();

        let url = origin.origin_url();
        let client = reqwest::Client::builder().build().unwrap();
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.status(), 200);

        // The request above has already completed, but teardown must
        // still resolve its JoinSet entry rather than leaving it
        // untracked, and must not hang past DRAIN_TIMEOUT.
        origin.teardown().await;
    }
}
