//! Concrete responses produced by the resolver.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::TryStreamExt;
use serde_json::Value;

use super::attachment::ByteStream;
use crate::error::Result;

/// A fully resolved response: what the listener writes back for a request.
#[derive(Debug)]
pub struct ResolvedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

/// Response payload.
pub enum ResponseBody {
    /// No body.
    Empty,
    /// Plain string, served as `text/html`.
    Text(String),
    /// Structured data, served as JSON.
    Json(Value),
    /// Attachment contents, streamed from disk.
    Stream(ByteStream),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl ResolvedResponse {
    /// The response for a request no double matches.
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE)?.to_str().ok()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION)?.to_str().ok()
    }

    /// Collect the body into memory, draining attachment streams.
    pub async fn into_bytes(self) -> Result<Bytes> {
        let bytes = match self.body {
            ResponseBody::Empty => Bytes::new(),
            ResponseBody::Text(text) => Bytes::from(text),
            ResponseBody::Json(value) => Bytes::from(serde_json::to_vec(&value)?),
            ResponseBody::Stream(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Bytes::from(chunks.concat())
            }
        };
        Ok(bytes)
    }
}

impl ResponseBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl IntoResponse for ResolvedResponse {
    fn into_response(self) -> Response {
        let body = match self.body {
            ResponseBody::Empty => Body::empty(),
            ResponseBody::Text(text) => Body::from(text),
            ResponseBody::Json(value) => Body::from(value.to_string()),
            ResponseBody::Stream(stream) => Body::from_stream(stream),
        };
        (self.status, self.headers, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_not_found_is_empty_404() {
        let response = ResolvedResponse::not_found();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.is_empty());
        assert!(response.content_type().is_none());
        assert!(response.into_bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_into_bytes_concatenates_stream_chunks() {
        let chunks = vec![Ok(Bytes::from("var a")), Ok(Bytes::from(" = 1;"))];
        let response = ResolvedResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Stream(futures::stream::iter(chunks).boxed()),
        };

        assert_eq!(response.into_bytes().await.unwrap(), "var a = 1;");
    }

    #[tokio::test]
    async fn test_into_response_keeps_status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("http://google.com"));
        let resolved = ResolvedResponse {
            status: StatusCode::FOUND,
            headers,
            body: ResponseBody::Empty,
        };

        let response = resolved.into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "http://google.com");
    }
}
