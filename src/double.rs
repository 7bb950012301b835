//! The `Double` type: one request-matching rule plus its canned response.
//!
//! A [`Double`] can only be obtained through a validating constructor
//! ([`Double::new`], [`Double::from_value`] or serde deserialization), so
//! every double held by the registry is known to carry a method and a url.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use axum::http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{DoubleError, Result};

/// A registered rule mapping an HTTP method and URL to a canned response.
///
/// Deserializes from the camelCase wire shape used by server configs:
///
/// ```json
/// {
///   "request": { "method": "POST", "url": "http://localhost:8001/some-example" },
///   "response": { "status": 201, "data": { "id": 1 } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDouble", into = "RawDouble")]
pub struct Double {
    request: DoubleRequest,
    response: Option<DoubleResponse>,
    fixture: Option<String>,
    attachment: Option<Attachment>,
    route: String,
}

/// The request side of a double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleRequest {
    /// Normalized (upper-case) HTTP method.
    pub method: Method,
    /// URL the double answers for; unique together with the method.
    pub url: String,
}

/// The response side of a double.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoubleResponse {
    pub status: Option<StatusCode>,
    pub data: Option<Value>,
    pub redirect_url: Option<String>,
    pub fixture: Option<String>,
}

/// A file served verbatim as the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path_to_file: PathBuf,
}

impl Double {
    /// Create a double answering `method` on `url` with an empty 200.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleError::MalformedDouble`] if `url` is empty or
    /// `method` is not a valid HTTP method token.
    pub fn new(method: &str, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(DoubleError::missing_request());
        }
        let method = parse_method(method)?;
        Ok(Self {
            route: derive_route(&url),
            request: DoubleRequest { method, url },
            response: None,
            fixture: None,
            attachment: None,
        })
    }

    /// Shorthand for a `GET` double.
    pub fn get(url: impl Into<String>) -> Result<Self> {
        Self::new("GET", url)
    }

    /// Build a double from an untyped JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleError::MalformedDouble`] with the message
    /// "Double missing request property." when `value` has no
    /// `request.url`, or a descriptive message for any other shape problem.
    pub fn from_value(value: Value) -> Result<Self> {
        if !is_a_double(&value) {
            return Err(DoubleError::missing_request());
        }
        serde_json::from_value(value).map_err(|e| DoubleError::MalformedDouble(e.to_string()))
    }

    /// Set the response status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.response_mut().status = Some(status);
        self
    }

    /// Set the literal response data.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.response_mut().data = Some(data.into());
        self
    }

    /// Answer with a redirect to `location`.
    pub fn with_redirect(mut self, status: StatusCode, location: impl Into<String>) -> Self {
        let response = self.response_mut();
        response.status = Some(status);
        response.redirect_url = Some(location.into());
        self
    }

    /// Load the response data from a fixture file at resolution time.
    pub fn with_fixture(mut self, name: impl Into<String>) -> Self {
        self.fixture = Some(name.into());
        self
    }

    /// Serve the file at `path` as the response body.
    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(Attachment {
            path_to_file: path.into(),
        });
        self
    }

    pub fn request(&self) -> &DoubleRequest {
        &self.request
    }

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn url(&self) -> &str {
        &self.request.url
    }

    pub fn response(&self) -> Option<&DoubleResponse> {
        self.response.as_ref()
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Fixture filename, preferring the top-level field over
    /// `response.fixture`.
    pub fn fixture(&self) -> Option<&str> {
        self.fixture
            .as_deref()
            .or_else(|| self.response.as_ref()?.fixture.as_deref())
    }

    /// Percent-decoded path the listener matches incoming requests against.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Configured status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref()?.status
    }

    /// True if this double is keyed by (`method`, `url`).
    ///
    /// The method comparison ignores case; the url must match exactly.
    pub fn matches(&self, method: &str, url: &str) -> bool {
        self.request.url == url && self.request.method.as_str().eq_ignore_ascii_case(method)
    }

    /// True if this double shares its (method, url) key with `other`.
    pub fn same_key(&self, other: &Double) -> bool {
        self.request == other.request
    }

    fn response_mut(&mut self) -> &mut DoubleResponse {
        self.response.get_or_insert_with(DoubleResponse::default)
    }
}

/// True iff `value` is an object whose `request` field is an object with a
/// `url` field.
pub fn is_a_double(value: &Value) -> bool {
    value
        .get("request")
        .and_then(|request| request.get("url"))
        .is_some_and(|url| !url.is_null())
}

/// True iff `value` is a non-empty array whose every element satisfies
/// [`is_a_double`].
pub fn is_array_of_doubles(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| !items.is_empty() && items.iter().all(is_a_double))
}

/// Percent-decode a request path for route comparison.
pub(crate) fn normalize_route(path: &str) -> String {
    urlencoding::decode(path)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| path.to_string())
}

fn derive_route(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if !parsed.cannot_be_a_base() => normalize_route(parsed.path()),
        _ => {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            if path.starts_with('/') {
                normalize_route(path)
            } else {
                normalize_route(&format!("/{path}"))
            }
        }
    }
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        DoubleError::MalformedDouble(format!("Double has invalid request method '{method}'."))
    })
}

// Wire representation. Everything is optional here so that validation can
// report a MalformedDouble instead of a generic serde "missing field".

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDouble {
    #[serde(default)]
    request: Option<RawRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<RawResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fixture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attachment: Option<RawAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(
        default,
        rename = "redirectURL",
        skip_serializing_if = "Option::is_none"
    )]
    redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fixture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAttachment {
    #[serde(rename = "pathToFile")]
    path_to_file: PathBuf,
}

impl TryFrom<RawDouble> for Double {
    type Error = DoubleError;

    fn try_from(raw: RawDouble) -> Result<Self> {
        let request = raw.request.ok_or_else(DoubleError::missing_request)?;
        let url = request.url.ok_or_else(DoubleError::missing_request)?;
        let mut double = Double::new(request.method.as_deref().unwrap_or("GET"), url)?;

        if let Some(response) = raw.response {
            let status = response
                .status
                .map(|code| {
                    StatusCode::from_u16(code).map_err(|_| {
                        DoubleError::MalformedDouble(format!(
                            "Double has invalid response status {code}."
                        ))
                    })
                })
                .transpose()?;
            double.response = Some(DoubleResponse {
                status,
                data: response.data,
                redirect_url: response.redirect_url,
                fixture: response.fixture,
            });
        }

        double.fixture = raw.fixture;
        double.attachment = raw.attachment.map(|a| Attachment {
            path_to_file: a.path_to_file,
        });
        Ok(double)
    }
}

impl From<Double> for RawDouble {
    fn from(double: Double) -> Self {
        Self {
            request: Some(RawRequest {
                method: Some(double.request.method.to_string()),
                url: Some(double.request.url),
            }),
            response: double.response.map(|r| RawResponse {
                status: r.status.map(|s| s.as_u16()),
                data: r.data,
                redirect_url: r.redirect_url,
                fixture: r.fixture,
            }),
            fixture: double.fixture,
            attachment: double.attachment.map(|a| RawAttachment {
                path_to_file: a.path_to_file,
            }),
        }
    }
}

impl Attachment {
    pub fn path(&self) -> &Path {
        &self.path_to_file
    }
}
