//! Content extraction collaborators.
//!
//! Each extractor turns an external source (web page, video captions, PDF)
//! into plain text for ingestion. Implementations are thin pass-throughs to
//! HTTP services; any provider failure surfaces as `CoreError::Upstream`.

mod captions;
mod pdf;
mod web;

use std::path::Path;

use async_trait::async_trait;

use crate::core::errors::CoreError;

pub use captions::TimedTextCaptionExtractor;
pub use pdf::{DisabledPdfExtractor, RemoteParsePdfExtractor};
pub use web::HttpPageExtractor;

/// Fetches a web page and reduces it to readable text.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String, CoreError>;
}

/// Fetches a video's caption track as plain text.
///
/// `Ok(None)` means the video has no usable English captions; that is a
/// caller-facing condition, not an upstream failure.
#[async_trait]
pub trait CaptionExtractor: Send + Sync {
    async fn extract_captions(&self, url: &str) -> Result<Option<String>, CoreError>;
}

/// Parses a PDF file into `(file name, text)`.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract_pdf(&self, path: &Path) -> Result<(String, String), CoreError>;
}
