//! Turns a matched [`Double`] into a concrete HTTP response.
//!
//! Resolution order:
//!
//! 1. `response.redirectURL` set: `Location` header, empty body.
//! 2. `attachment.pathToFile` set: file streamed as the body, content type
//!    from its extension.
//! 3. `fixture` set: the parsed fixture file becomes the response data.
//! 4. Otherwise `response.data`: strings are sent as `text/html`, anything
//!    else as JSON. No data means an empty body.
//!
//! The status is `response.status` when given and 200 otherwise.

mod attachment;
mod fixtures;
mod response;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;

use crate::double::Double;
use crate::error::{DoubleError, Result};

pub use attachment::{content_type_for, AttachmentSource, ByteStream, FsAttachmentSource};
pub use fixtures::{parse_fixture, FixtureLoader, FsFixtureLoader};
pub use response::{ResolvedResponse, ResponseBody};

/// Content type for string data.
pub const TEXT_HTML_UTF8: &str = "text/html; charset=utf-8";
/// Content type for structured data.
pub const APPLICATION_JSON_UTF8: &str = "application/json; charset=utf-8";

/// Resolves doubles against a fixtures folder and file collaborators.
///
/// Cheaply cloneable; clones share the same collaborators.
#[derive(Clone)]
pub struct Resolver {
    fixtures_folder: PathBuf,
    fixtures: Arc<dyn FixtureLoader>,
    attachments: Arc<dyn AttachmentSource>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("fixtures_folder", &self.fixtures_folder)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver that reads fixtures and attachments from disk.
    pub fn new(fixtures_folder: impl Into<PathBuf>) -> Self {
        Self::with_collaborators(
            fixtures_folder,
            Arc::new(FsFixtureLoader),
            Arc::new(FsAttachmentSource),
        )
    }

    /// Create a resolver with custom fixture and attachment collaborators.
    pub fn with_collaborators(
        fixtures_folder: impl Into<PathBuf>,
        fixtures: Arc<dyn FixtureLoader>,
        attachments: Arc<dyn AttachmentSource>,
    ) -> Self {
        Self {
            fixtures_folder: fixtures_folder.into(),
            fixtures,
            attachments,
        }
    }

    pub fn fixtures_folder(&self) -> &Path {
        &self.fixtures_folder
    }

    /// Same collaborators, different fixtures folder.
    pub fn with_fixtures_folder(&self, fixtures_folder: impl Into<PathBuf>) -> Self {
        Self {
            fixtures_folder: fixtures_folder.into(),
            ..self.clone()
        }
    }

    /// Resolve `double` into a response.
    ///
    /// # Errors
    ///
    /// Fixture and attachment failures are returned as-is; a redirect URL
    /// that is not a valid header value is a `MalformedDouble`.
    #[tracing::instrument(
        skip(self, double),
        fields(method = %double.method(), url = double.url())
    )]
    pub async fn resolve(&self, double: &Double) -> Result<ResolvedResponse> {
        let response = double.response();
        let status = double.status().unwrap_or(StatusCode::OK);
        let mut headers = HeaderMap::new();

        if let Some(location) = response.and_then(|r| r.redirect_url.as_deref()) {
            let location = HeaderValue::from_str(location).map_err(|_| {
                DoubleError::MalformedDouble(format!(
                    "Double has invalid redirectURL '{location}'."
                ))
            })?;
            headers.insert(LOCATION, location);
            return Ok(ResolvedResponse {
                status,
                headers,
                body: ResponseBody::Empty,
            });
        }

        if let Some(attachment) = double.attachment() {
            let stream = self.attachments.open(attachment.path()).await?;
            headers.insert(CONTENT_TYPE, content_type_for(attachment.path()));
            return Ok(ResolvedResponse {
                status,
                headers,
                body: ResponseBody::Stream(stream),
            });
        }

        let data = match double.fixture() {
            Some(name) => Some(
                self.fixtures
                    .load_fixture(&self.fixtures_folder, name)
                    .await?,
            ),
            None => response.and_then(|r| r.data.clone()),
        };

        let body = match data {
            None => ResponseBody::Empty,
            Some(Value::String(text)) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML_UTF8));
                ResponseBody::Text(text)
            }
            Some(value) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON_UTF8));
                ResponseBody::Json(value)
            }
        };

        Ok(ResolvedResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(crate::server::DEFAULT_FIXTURES_FOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    const URL: &str = "http://localhost:8001/some-example";

    /// Serves a single fixture from memory and records what was asked for.
    struct InMemoryFixtures {
        value: Value,
        requested: parking_lot::Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl FixtureLoader for InMemoryFixtures {
        async fn load_fixture(&self, folder: &Path, name: &str) -> Result<Value> {
            self.requested.lock().push(folder.join(name));
            Ok(self.value.clone())
        }
    }

    #[tokio::test]
    async fn test_empty_double_resolves_to_empty_200() {
        let response = Resolver::default()
            .resolve(&Double::get(URL).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.is_empty());
        assert!(response.content_type().is_none());
    }

    #[tokio::test]
    async fn test_string_data_is_html() {
        let double = Double::get(URL).unwrap().with_data("plainTextPayload");
        let response = Resolver::default().resolve(&double).await.unwrap();

        assert_eq!(response.content_type(), Some(TEXT_HTML_UTF8));
        assert_eq!(response.body.as_text(), Some("plainTextPayload"));
    }

    #[tokio::test]
    async fn test_structured_data_is_json() {
        let double = Double::get(URL)
            .unwrap()
            .with_status(StatusCode::CREATED)
            .with_data(json!({ "arbitraryPayload": true }));
        let response = Resolver::default().resolve(&double).await.unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.content_type(), Some(APPLICATION_JSON_UTF8));
        assert_eq!(
            response.body.as_json(),
            Some(&json!({ "arbitraryPayload": true }))
        );
    }

    #[tokio::test]
    async fn test_redirect_sets_location_and_skips_body() {
        for status in [StatusCode::MOVED_PERMANENTLY, StatusCode::FOUND] {
            let double = Double::get(URL)
                .unwrap()
                .with_data("ignored")
                .with_redirect(status, "http://google.com");
            let response = Resolver::default().resolve(&double).await.unwrap();

            assert_eq!(response.status, status);
            assert_eq!(response.location(), Some("http://google.com"));
            assert!(response.body.is_empty());
        }
    }

    #[tokio::test]
    async fn test_redirect_without_status_defaults_to_200() {
        let double = Double::from_value(json!({
            "request": { "url": URL },
            "response": { "redirectURL": "http://google.com" }
        }))
        .unwrap();
        let response = Resolver::default().resolve(&double).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.location(), Some("http://google.com"));
    }

    #[tokio::test]
    async fn test_fixture_overrides_data() {
        let fixtures = Arc::new(InMemoryFixtures {
            value: json!({ "fromFixture": true }),
            requested: Default::default(),
        });
        let resolver = Resolver::with_collaborators(
            "some/folder",
            fixtures.clone(),
            Arc::new(FsAttachmentSource),
        );
        let double = Double::get(URL)
            .unwrap()
            .with_data("ignored")
            .with_fixture("payload.json");

        let response = resolver.resolve(&double).await.unwrap();

        assert_eq!(response.content_type(), Some(APPLICATION_JSON_UTF8));
        assert_eq!(response.body.as_json(), Some(&json!({ "fromFixture": true })));
        assert_eq!(
            fixtures.requested.lock().as_slice(),
            &[PathBuf::from("some/folder/payload.json")]
        );
    }

    #[tokio::test]
    async fn test_fixture_from_disk() {
        let resolver = Resolver::new("tests/fixtures");
        let double = Double::get(URL)
            .unwrap()
            .with_fixture("arbitraryFixture.json");

        let response = resolver.resolve(&double).await.unwrap();
        let content = std::fs::read_to_string("tests/fixtures/arbitraryFixture.json").unwrap();
        let expected: Value = serde_json::from_str(&content).unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_json(), Some(&expected));
    }

    #[tokio::test]
    async fn test_missing_fixture_fails_resolution() {
        let double = Double::get(URL).unwrap().with_fixture("nope.json");
        let err = Resolver::new("tests/fixtures")
            .resolve(&double)
            .await
            .unwrap_err();

        assert!(matches!(err, DoubleError::FixtureNotFound { .. }));
    }

    #[tokio::test]
    async fn test_attachment_streams_file() {
        let double = Double::get("http://localhost:8001/doubles/GetMeBundle.js")
            .unwrap()
            .with_attachment("./tests/resources/bundle.js");
        let response = Resolver::default().resolve(&double).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.content_type(),
            Some("application/javascript; charset=UTF-8")
        );
        let body = response.into_bytes().await.unwrap();
        assert_eq!(body, std::fs::read("tests/resources/bundle.js").unwrap());
    }

    #[tokio::test]
    async fn test_missing_attachment_fails_resolution() {
        let double = Double::get(URL)
            .unwrap()
            .with_attachment("tests/resources/missing.js");
        let err = Resolver::default().resolve(&double).await.unwrap_err();

        assert!(matches!(err, DoubleError::AttachmentNotFound { .. }));
    }
}
