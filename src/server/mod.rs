//! The double server: one registry, one listener lifecycle.
//!
//! # Example
//!
//! ```no_run
//! use http_doubles::{Double, Server, ServerConfig};
//! use serde_json::json;
//!
//! # async fn example() -> http_doubles::Result<()> {
//! let mut server = Server::new();
//!
//! let config = ServerConfig::new().with_port(8002).with_double(
//!     Double::new("POST", "http://localhost:8002/some-example")?
//!         .with_data(json!({ "name": "Test" })),
//! );
//! let addr = server.serve(config).await?;
//! println!("serving doubles on {addr}");
//!
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod listener;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::double::Double;
use crate::error::Result;
use crate::registry::{Registration, Registry, SharedRegistry};
use crate::resolver::{
    AttachmentSource, FixtureLoader, FsAttachmentSource, FsFixtureLoader, ResolvedResponse,
    Resolver,
};

pub use config::{ServerConfig, DEFAULT_FIXTURES_FOLDER, DEFAULT_HTTP_PORT};

use listener::{Listener, ListenerState};

/// An HTTP test-double server.
///
/// Owns the registry of doubles and at most one listener. While stopped,
/// doubles can still be registered and resolved through
/// [`Server::request`]; [`Server::start`] serves whatever the registry
/// holds.
#[derive(Debug)]
pub struct Server {
    registry: SharedRegistry,
    resolver: Resolver,
    http_port: u16,
    listener: Option<Listener>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// Create a stopped server with default port, fixtures folder and an
    /// empty registry.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Register a double without touching the listener.
    ///
    /// Usable before or after [`Server::start`]; a running listener sees
    /// the double on its next request.
    pub fn load(&self, double: Double) -> Registration {
        self.register_double(double)
    }

    /// Register a double, replacing any double with the same method and
    /// url in place.
    pub fn register_double(&self, double: Double) -> Registration {
        let method = double.method().clone();
        let url = double.url().to_string();
        let registration = self.registry.write().register_double(double);
        debug!(%method, %url, ?registration, "registered double");
        registration
    }

    /// Validate an untyped value and register it.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleError::MalformedDouble`](crate::DoubleError::MalformedDouble)
    /// without touching the registry if `value` is not a valid double.
    pub fn register_value(&self, value: Value) -> Result<Registration> {
        Ok(self.register_double(Double::from_value(value)?))
    }

    /// Remove every double with url `uri`, whatever its method.
    pub fn remove_all_doubles_with_uri(&self, uri: &str) -> usize {
        self.registry.write().remove_all_doubles_with_uri(uri)
    }

    /// True if any double, for any method, has url `uri`.
    pub fn is_registered(&self, uri: &str) -> bool {
        self.registry.read().is_registered(uri)
    }

    /// Snapshot of the registered doubles in registration order.
    pub fn doubles(&self) -> Vec<Double> {
        self.registry.read().doubles().to_vec()
    }

    /// The registry shared with the listener.
    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Address the listener is bound to, if listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(Listener::local_addr)
    }

    /// Port used by [`Server::start`] when none is given.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn fixtures_folder(&self) -> &Path {
        self.resolver.fixtures_folder()
    }

    /// Reconfigure the server and start listening.
    ///
    /// Stops the current listener (waiting for in-flight requests), applies
    /// the port and fixtures folder from `config`, replaces the registry
    /// contents with `config.doubles` when present, then starts listening.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleError::Bind`](crate::DoubleError::Bind) if the port
    /// cannot be bound; the server is then stopped.
    #[tracing::instrument(skip(self, config), fields(http_port = config.http_port))]
    pub async fn serve(&mut self, config: ServerConfig) -> Result<SocketAddr> {
        self.stop().await?;

        self.http_port = config.http_port;
        self.resolver = self.resolver.with_fixtures_folder(config.fixtures_folder);

        if let Some(doubles) = config.doubles {
            self.reload(doubles);
        }

        self.start(Some(self.http_port)).await
    }

    /// Validate an untyped configuration and [`serve`](Server::serve) it.
    ///
    /// Validation happens before the running listener is touched, so a
    /// malformed configuration leaves the server as it was.
    pub async fn serve_value(&mut self, config: Value) -> Result<SocketAddr> {
        let config = ServerConfig::from_value(config)?;
        self.serve(config).await
    }

    /// Start listening on `port`, or on the configured port when `None`.
    ///
    /// A running listener is stopped first. Returns the bound address,
    /// which differs from `port` only when `port` is 0.
    pub async fn start(&mut self, port: Option<u16>) -> Result<SocketAddr> {
        self.stop().await?;

        let port = port.unwrap_or(self.http_port);
        let state = ListenerState::new(Arc::clone(&self.registry), self.resolver.clone());
        let listener = Listener::bind(port, state).await?;
        let addr = listener.local_addr();

        self.http_port = port;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Stop listening.
    ///
    /// Returns once no request handler is running and the port is free
    /// again. The registry is kept. A no-op when already stopped.
    pub async fn stop(&mut self) -> Result<()> {
        match self.listener.take() {
            Some(listener) => listener.close().await,
            None => Ok(()),
        }
    }

    /// Replace the registry contents under a single write lock.
    fn reload(&self, doubles: Vec<Double>) {
        let mut registry = self.registry.write();
        registry.clear();
        for double in doubles {
            registry.register_double(double);
        }
        info!(doubles = registry.len(), "registry reloaded");
    }

    /// Resolve what the server would answer for (`method`, `url`) without
    /// going through a listener.
    ///
    /// The url must match a registered double's url exactly; unmatched
    /// requests resolve to an empty 404.
    #[tracing::instrument(skip(self))]
    pub async fn request(&self, method: &str, url: &str) -> Result<ResolvedResponse> {
        let matched = self.registry.read().lookup(method, url).cloned();

        match matched {
            Some(double) => self.resolver.resolve(&double).await,
            None => {
                debug!("no double registered");
                Ok(ResolvedResponse::not_found())
            }
        }
    }
}

/// Builder for a [`Server`] with custom configuration or collaborators.
#[derive(Default)]
pub struct ServerBuilder {
    config: ServerConfig,
    fixtures: Option<Arc<dyn FixtureLoader>>,
    attachments: Option<Arc<dyn AttachmentSource>>,
}

impl ServerBuilder {
    /// Start from an existing configuration, including its doubles.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    pub fn fixtures_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.config.fixtures_folder = folder.into();
        self
    }

    pub fn double(mut self, double: Double) -> Self {
        self.config = self.config.with_double(double);
        self
    }

    /// Replace the filesystem fixture loader.
    pub fn fixture_loader(mut self, loader: Arc<dyn FixtureLoader>) -> Self {
        self.fixtures = Some(loader);
        self
    }

    /// Replace the filesystem attachment source.
    pub fn attachment_source(mut self, source: Arc<dyn AttachmentSource>) -> Self {
        self.attachments = Some(source);
        self
    }

    pub fn build(self) -> Server {
        let resolver = Resolver::with_collaborators(
            self.config.fixtures_folder,
            self.fixtures.unwrap_or_else(|| Arc::new(FsFixtureLoader)),
            self.attachments
                .unwrap_or_else(|| Arc::new(FsAttachmentSource)),
        );

        let registry = self
            .config
            .doubles
            .into_iter()
            .flatten()
            .fold(Registry::new(), Registry::with_double);

        Server {
            registry: registry.shared(),
            resolver,
            http_port: self.config.http_port,
            listener: None,
        }
    }
}
