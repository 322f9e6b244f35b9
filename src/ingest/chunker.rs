use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentMetadata};
use crate::core::errors::CoreError;

/// A bounded-size slice of a document's text.
///
/// Chunks are exact spans of the source content (no trimming), so the
/// non-overlapping portions of consecutive chunks concatenate back to the
/// original document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// Copy of the parent document's metadata, unchanged.
    pub metadata: DocumentMetadata,
    /// Char offset of this chunk within the parent content.
    pub start_offset: usize,
    /// Position of this chunk in left-to-right document order.
    pub ordinal: usize,
}

/// Splits documents into overlapping chunks bounded by a character budget.
///
/// Boundaries are chosen by descending preference: paragraph break, then
/// sentence end, then word gap, then a hard character cut; within a class
/// the largest boundary that keeps the chunk within `max_size` wins.
#[derive(Debug, Clone)]
pub struct Chunker {
    max_size: usize,
    overlap: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum BreakClass {
    Word,
    Sentence,
    Paragraph,
}

impl Chunker {
    pub fn new(max_size: usize, overlap: usize) -> Result<Self, CoreError> {
        if max_size == 0 {
            return Err(CoreError::InvalidConfiguration(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= max_size {
            return Err(CoreError::InvalidConfiguration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, max_size
            )));
        }
        Ok(Chunker { max_size, overlap })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split a document into ordered chunks, each inheriting the document
    /// metadata. Empty content yields no chunks.
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.content.chars().collect();
        let total = chars.len();

        let mut chunks = Vec::new();
        if total == 0 {
            return chunks;
        }

        let mut start = 0;
        let mut ordinal = 0;

        loop {
            let hard_end = (start + self.max_size).min(total);
            let end = if hard_end == total {
                total
            } else {
                best_break(&chars, start, hard_end)
            };

            chunks.push(Chunk {
                content: chars[start..end].iter().collect(),
                metadata: document.metadata.clone(),
                start_offset: start,
                ordinal,
            });
            ordinal += 1;

            if end == total {
                break;
            }

            // Next chunk starts inside the tail of this one, aligned to a
            // boundary when one exists in the overlap window.
            let floor = end.saturating_sub(self.overlap).max(start + 1);
            start = overlap_start(&chars, floor, end);
        }

        chunks
    }
}

/// Classify position `pos` (a cut before `chars[pos]`) as a break point.
fn break_class(chars: &[char], pos: usize) -> Option<BreakClass> {
    if pos == 0 || pos >= chars.len() {
        return None;
    }

    let before = chars[pos - 1];
    if before == '\n' && pos >= 2 && chars[pos - 2] == '\n' {
        return Some(BreakClass::Paragraph);
    }
    if before.is_whitespace() && pos >= 2 && matches!(chars[pos - 2], '.' | '!' | '?') {
        return Some(BreakClass::Sentence);
    }
    if before.is_whitespace() {
        return Some(BreakClass::Word);
    }
    None
}

/// Largest break position in `(start, hard_end]`, best class first; falls
/// back to the hard cut when the window has no natural boundary.
fn best_break(chars: &[char], start: usize, hard_end: usize) -> usize {
    let mut best_sentence = None;
    let mut best_word = None;

    for pos in (start + 1..=hard_end).rev() {
        match break_class(chars, pos) {
            Some(BreakClass::Paragraph) => return pos,
            Some(BreakClass::Sentence) if best_sentence.is_none() => best_sentence = Some(pos),
            Some(BreakClass::Word) if best_word.is_none() => best_word = Some(pos),
            _ => {}
        }
    }

    best_sentence.or(best_word).unwrap_or(hard_end)
}

/// Smallest break position in `[floor, end)`, so the next chunk starts on
/// a natural boundary whenever the overlap window contains one.
fn overlap_start(chars: &[char], floor: usize, end: usize) -> usize {
    (floor..end)
        .find(|&pos| break_class(chars, pos).is_some())
        .unwrap_or(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::document::Document;

    fn doc(content: &str) -> Document {
        Document::new(content, "test-source", "Test", 7)
    }

    fn reconstruct(chunks: &[Chunk]) -> String {
        let mut out: Vec<char> = Vec::new();
        for chunk in chunks {
            let chars: Vec<char> = chunk.content.chars().collect();
            let skip = out.len() - chunk.start_offset;
            out.extend(chars.into_iter().skip(skip));
        }
        out.into_iter().collect()
    }

    #[test]
    fn overlap_must_stay_below_max_size() {
        assert!(matches!(
            Chunker::new(100, 100),
            Err(CoreError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Chunker::new(0, 0),
            Err(CoreError::InvalidConfiguration(_))
        ));
        assert!(Chunker::new(100, 99).is_ok());
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let chunker = Chunker::new(2000, 1000).unwrap();
        assert!(chunker.split(&doc("")).is_empty());
    }

    #[test]
    fn short_document_is_a_single_chunk() {
        let chunker = Chunker::new(2000, 1000).unwrap();
        let chunks = chunker.split(&doc("A short note."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "A short note.");
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn chunks_inherit_parent_metadata_unchanged() {
        let chunker = Chunker::new(50, 10).unwrap();
        let document = doc(&"The quick brown fox. ".repeat(10));
        for chunk in chunker.split(&document) {
            assert_eq!(chunk.metadata, document.metadata);
        }
    }

    #[test]
    fn concatenation_ignoring_overlap_reconstructs_content() {
        let text = "First paragraph with several sentences. Another one here.\n\n\
                    Second paragraph, also not short. It keeps going for a while! \
                    And a question? Then more prose follows without any break at all \
                    until we run out of words to write down.";
        let chunker = Chunker::new(60, 20).unwrap();
        let chunks = chunker.split(&doc(text));

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 60);
        }
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn paragraph_breaks_beat_later_sentence_breaks() {
        let text = format!("{}\n\n{}", "A".repeat(20), "B".repeat(40));
        let chunker = Chunker::new(50, 10).unwrap();
        let chunks = chunker.split(&doc(&text));

        assert!(chunks[0].content.ends_with("\n\n"));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn repeated_sentences_split_with_shared_overlap() {
        let text = "The quick brown fox. ".repeat(200);
        let chunker = Chunker::new(2000, 1000).unwrap();
        let chunks = chunker.split(&doc(&text));

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 2000);
        }

        for pair in chunks.windows(2) {
            let prev_end = pair[0].start_offset + pair[0].content.chars().count();
            let shared = prev_end - pair[1].start_offset;
            assert!(shared > 0, "adjacent chunks must overlap");
            assert!(shared <= 1000);

            let suffix: String = pair[0]
                .content
                .chars()
                .skip(pair[0].content.chars().count() - shared)
                .collect();
            let prefix: String = pair[1].content.chars().take(shared).collect();
            assert_eq!(suffix, prefix);
        }

        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn ordinals_follow_document_order() {
        let chunker = Chunker::new(30, 5).unwrap();
        let chunks = chunker.split(&doc(&"word ".repeat(50)));
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, i);
        }
        for pair in chunks.windows(2) {
            assert!(pair[0].start_offset < pair[1].start_offset);
        }
    }
}
