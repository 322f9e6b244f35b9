use serde::{Deserialize, Serialize};

/// Metadata attached to an ingested document and inherited by every chunk
/// split from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Origin of the content (URL, file name, caller-supplied label).
    pub source: String,
    /// Caller-chosen grouping used to filter retrieval.
    pub category: String,
    /// Stable numeric tag derived from the source string.
    pub tag: u64,
}

/// One ingested item before chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Wrap extracted text and its metadata into a document record.
    ///
    /// Total: empty content is allowed and simply yields zero chunks
    /// downstream.
    pub fn new(
        content: impl Into<String>,
        source: impl Into<String>,
        category: impl Into<String>,
        tag: u64,
    ) -> Self {
        Document {
            content: content.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                category: category.into(),
                tag,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_is_accepted() {
        let doc = Document::new("", "https://example.com", "Articles", 42);
        assert!(doc.content.is_empty());
        assert_eq!(doc.metadata.source, "https://example.com");
        assert_eq!(doc.metadata.category, "Articles");
        assert_eq!(doc.metadata.tag, 42);
    }
}
