//! Attachments: files served verbatim as a response body.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use axum::http::HeaderValue;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::io::ReaderStream;

use crate::error::{DoubleError, Result};

/// Byte stream of an attachment's contents.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Opens attachment files as byte streams.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    /// Open the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DoubleError::AttachmentNotFound`] if the file does not exist.
    async fn open(&self, path: &Path) -> Result<ByteStream>;
}

/// Streams attachments from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAttachmentSource;

#[async_trait]
impl AttachmentSource for FsAttachmentSource {
    async fn open(&self, path: &Path) -> Result<ByteStream> {
        match tokio::fs::File::open(path).await {
            Ok(file) => Ok(ReaderStream::new(file).boxed()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DoubleError::AttachmentNotFound {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Content type for an attachment, derived from its file extension.
///
/// JavaScript is always reported as `application/javascript`. Textual
/// types carry `charset=UTF-8`; unknown extensions fall back to
/// `application/octet-stream`.
pub fn content_type_for(path: &Path) -> HeaderValue {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let essence = match extension.as_deref() {
        Some("js") | Some("mjs") => "application/javascript".to_string(),
        Some(ext) => mime_guess::from_ext(ext)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
        None => "application/octet-stream".to_string(),
    };

    let value = if has_charset(&essence) {
        format!("{essence}; charset=UTF-8")
    } else {
        essence
    };

    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

fn has_charset(essence: &str) -> bool {
    essence.starts_with("text/")
        || essence == "application/javascript"
        || essence == "application/json"
}
