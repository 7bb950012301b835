//! HTTP test-double server.
//!
//! Lets a test suite declare canned request/response pairs ("doubles") and
//! serve them over real HTTP, so integration tests can run against a fake
//! upstream service instead of a real one.
//!
//! # Quick Start
//!
//! ```no_run
//! use http_doubles::{Double, Server, ServerConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> http_doubles::Result<()> {
//!     let mut server = Server::new();
//!
//!     // Doubles from a config object; replaces anything registered before
//!     let config = ServerConfig::from_value(json!({
//!         "httpPort": 8001,
//!         "doubles": [{
//!             "request": { "method": "POST", "url": "http://localhost:8001/some-example" },
//!             "response": { "data": { "name": "Test" } }
//!         }]
//!     }))?;
//!     server.serve(config).await?;
//!
//!     // More doubles can be loaded while listening
//!     server.load(
//!         Double::get("http://localhost:8001/plain")?.with_data("plainTextPayload"),
//!     );
//!
//!     // Ask what a request would get without going over the network
//!     let response = server.request("GET", "http://localhost:8001/plain").await?;
//!     assert_eq!(response.status, 200);
//!
//!     server.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Double`] - a validated request-matching rule plus its response
//! - [`Registry`] - ordered doubles, one per (method, url)
//! - [`Resolver`] - turns a double into a [`ResolvedResponse`]
//! - [`Server`] - owns the registry and the listener lifecycle
//!
//! Fixture and attachment file access goes through the [`FixtureLoader`]
//! and [`AttachmentSource`] traits.

pub mod cli;
mod double;
mod error;
mod output;
mod registry;
mod resolver;
mod server;

// Re-export core types
pub use double::{
    is_a_double, is_array_of_doubles, Attachment, Double, DoubleRequest, DoubleResponse,
};
pub use error::{DoubleError, Result, MISSING_REQUEST};
pub use output::{DoubleRow, PrettyPrint};
pub use registry::{Registration, Registry, SharedRegistry};

// Re-export resolution
pub use resolver::{
    content_type_for, parse_fixture, AttachmentSource, ByteStream, FixtureLoader,
    FsAttachmentSource, FsFixtureLoader, ResolvedResponse, Resolver, ResponseBody,
    APPLICATION_JSON_UTF8, TEXT_HTML_UTF8,
};

// Re-export server lifecycle
pub use server::{
    Server, ServerBuilder, ServerConfig, DEFAULT_FIXTURES_FOLDER, DEFAULT_HTTP_PORT,
};
