//! axum-based HTTP listener serving the registry.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::double::normalize_route;
use crate::error::{DoubleError, Result};
use crate::registry::SharedRegistry;
use crate::resolver::{ResolvedResponse, Resolver};

/// State handed to every request handler.
#[derive(Debug, Clone)]
pub(crate) struct ListenerState {
    registry: SharedRegistry,
    resolver: Resolver,
}

impl ListenerState {
    pub(crate) fn new(registry: SharedRegistry, resolver: Resolver) -> Self {
        Self { registry, resolver }
    }
}

/// Router answering every method and path from the registry.
pub(crate) fn router(state: ListenerState) -> Router {
    Router::new().fallback(handle_request).with_state(state)
}

async fn handle_request(
    State(state): State<ListenerState>,
    method: Method,
    uri: Uri,
) -> Response {
    let path = normalize_route(uri.path());

    // Clone out so the lock is released before any file I/O.
    let matched = state
        .registry
        .read()
        .find_route(method.as_str(), &path)
        .cloned();

    let Some(double) = matched else {
        debug!(%method, %path, "no double registered");
        return ResolvedResponse::not_found().into_response();
    };

    debug!(%method, %path, url = double.url(), "matched double");

    match state.resolver.resolve(&double).await {
        Ok(resolved) => resolved.into_response(),
        Err(e) => {
            error!(%method, %path, error = %e, "failed to resolve double");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.kind(),
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// A running listener.
///
/// Serves the same port on both loopback addresses so clients resolving
/// `localhost` to either family reach it. Dropping it signals the serving
/// tasks to shut down without waiting; use [`Listener::close`] to wait
/// until the port is released.
pub(crate) struct Listener {
    addr: SocketAddr,
    shutdown: Option<watch::Sender<()>>,
    tasks: Vec<JoinHandle<std::io::Result<()>>>,
}

impl Listener {
    /// Bind `port` on 127.0.0.1 and, when available, on ::1, then start
    /// serving.
    ///
    /// Port 0 binds an OS-assigned port; the IPv6 socket reuses whatever
    /// port the IPv4 one got.
    pub(crate) async fn bind(port: u16, state: ListenerState) -> Result<Self> {
        let v4 = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(|source| DoubleError::Bind { port, source })?;
        let addr = v4.local_addr()?;

        let mut sockets = vec![v4];
        match TcpListener::bind((Ipv6Addr::LOCALHOST, addr.port())).await {
            Ok(v6) => sockets.push(v6),
            Err(e) => warn!(port = addr.port(), error = %e, "not serving on ::1"),
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let app = router(state);

        let tasks = sockets
            .into_iter()
            .map(|socket| {
                let app = app.clone();
                let mut shutdown_rx = shutdown_rx.clone();
                tokio::spawn(async move {
                    axum::serve(socket, app)
                        .with_graceful_shutdown(async move {
                            // Resolves on send and when the sender is dropped
                            let _ = shutdown_rx.changed().await;
                        })
                        .await
                })
            })
            .collect::<Vec<_>>();

        info!(%addr, sockets = tasks.len(), "listening");

        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            tasks,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting, wait for in-flight requests to finish and release
    /// the port.
    pub(crate) async fn close(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        let mut outcome = Ok(());
        for task in std::mem::take(&mut self.tasks) {
            let served = match task.await {
                Ok(served) => served.map_err(DoubleError::from),
                Err(e) if e.is_cancelled() => Ok(()),
                Err(e) => Err(std::io::Error::other(e).into()),
            };
            // Keep draining the other sockets; report the first failure
            if outcome.is_ok() {
                outcome = served;
            }
        }

        info!(addr = %self.addr, "stopped listening");
        outcome
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}
