//! Ingestion pipeline: extract content, tag it, chunk it, assign ids and
//! upsert the result into the owner's vector index.

pub mod chunker;
pub mod document;
pub mod ids;
pub mod tag;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::CoreError;
use crate::extract::{CaptionExtractor, PageExtractor, PdfExtractor};
use crate::index::IndexManager;

pub use chunker::{Chunk, Chunker};
pub use document::{Document, DocumentMetadata};
pub use ids::assign_ids;
pub use tag::derive_tag;

/// Outcome of one ingestion call.
///
/// `grouping` is the tag-to-chunk-ids map built during this call only; it
/// is handed back to the caller and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub source: String,
    pub category: String,
    pub tag: u64,
    pub chunk_ids: Vec<String>,
    pub grouping: HashMap<u64, Vec<String>>,
}

pub struct IngestService {
    chunker: Chunker,
    tag_secret: Vec<u8>,
    index: Arc<IndexManager>,
    pages: Arc<dyn PageExtractor>,
    captions: Arc<dyn CaptionExtractor>,
    pdf: Arc<dyn PdfExtractor>,
}

impl IngestService {
    pub fn new(
        chunker: Chunker,
        tag_secret: impl Into<Vec<u8>>,
        index: Arc<IndexManager>,
        pages: Arc<dyn PageExtractor>,
        captions: Arc<dyn CaptionExtractor>,
        pdf: Arc<dyn PdfExtractor>,
    ) -> Self {
        IngestService {
            chunker,
            tag_secret: tag_secret.into(),
            index,
            pages,
            captions,
            pdf,
        }
    }

    /// Ingest a web page: fetch, strip to text, pipe through the shared
    /// pipeline with the URL as source.
    pub async fn ingest_url(
        &self,
        user_id: &str,
        url: &str,
        category: &str,
    ) -> Result<IngestReceipt, CoreError> {
        let text = self.pages.extract(url).await?;
        self.ingest_text(user_id, &text, url, category).await
    }

    /// Ingest a video's caption track. A video without usable English
    /// captions is an upstream condition the caller must surface.
    pub async fn ingest_captions(
        &self,
        user_id: &str,
        url: &str,
        category: &str,
    ) -> Result<IngestReceipt, CoreError> {
        let text = self
            .captions
            .extract_captions(url)
            .await?
            .ok_or_else(|| {
                CoreError::Upstream(format!(
                    "video has no English caption track: {}",
                    url
                ))
            })?;
        self.ingest_text(user_id, &text, url, category).await
    }

    /// Ingest a PDF file; the tag derives from the file name, not the path.
    pub async fn ingest_pdf(
        &self,
        user_id: &str,
        path: &Path,
        category: &str,
    ) -> Result<IngestReceipt, CoreError> {
        let (name, text) = self.pdf.extract_pdf(path).await?;
        self.ingest_text(user_id, &text, &name, category).await
    }

    /// The shared pipeline: tag, normalize, chunk, assign ids, upsert.
    pub async fn ingest_text(
        &self,
        user_id: &str,
        text: &str,
        source: &str,
        category: &str,
    ) -> Result<IngestReceipt, CoreError> {
        if user_id.trim().is_empty() {
            return Err(CoreError::invalid_argument("user id must not be empty"));
        }
        if source.trim().is_empty() || category.trim().is_empty() {
            return Err(CoreError::invalid_argument(
                "source and category are required",
            ));
        }

        let tag = derive_tag(source, &self.tag_secret);
        let document = Document::new(text, source, category, tag);
        let chunks = self.chunker.split(&document);
        let (chunk_ids, grouping) = assign_ids(&chunks);

        self.index.upsert(user_id, &chunks, &chunk_ids).await?;

        tracing::info!(
            "Ingested {} ({} chunks, tag {}) for user {}",
            source,
            chunks.len(),
            tag,
            user_id
        );

        Ok(IngestReceipt {
            source: source.to_string(),
            category: category.to_string(),
            tag,
            chunk_ids,
            grouping,
        })
    }
}
