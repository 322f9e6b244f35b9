//! Retrieval-augmented question answering over a user's index.

use std::sync::Arc;

use crate::core::errors::CoreError;
use crate::index::{ScoredChunk, UserIndex};
use crate::providers::{EmbeddingProvider, GenerationProvider};

const ANSWER_INSTRUCTION: &str = "Use the following stored documents to answer the question. \
If no documents are listed below, or none of them are relevant, say plainly that there are no \
relevant documents saved in memory, then answer from your own knowledge instead.";

const EMPTY_CONTEXT_MARKER: &str = "(no stored documents matched)";

/// Optional retrieval restriction: only chunks whose metadata category
/// equals `category` exactly are considered.
#[derive(Debug, Clone)]
pub struct CategoryFilter {
    pub category: String,
}

impl CategoryFilter {
    pub fn new(category: impl Into<String>) -> Result<Self, CoreError> {
        let category = category.into();
        if category.trim().is_empty() {
            return Err(CoreError::invalid_argument(
                "category filter must not be empty",
            ));
        }
        Ok(CategoryFilter { category })
    }
}

pub struct QueryEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
    max_retries: usize,
}

impl QueryEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        top_k: usize,
        max_retries: usize,
    ) -> Self {
        QueryEngine {
            embedder,
            generator,
            top_k,
            max_retries,
        }
    }

    /// Answer a question from the given index.
    ///
    /// Retrieves up to `top_k` nearest chunks (category-filtered when a
    /// filter is given) and hands them to the generation provider together
    /// with the question. An empty retrieval is not an error; the provider
    /// is instructed to say so and fall back to general knowledge.
    pub async fn answer(
        &self,
        query: &str,
        filter: Option<&CategoryFilter>,
        index: &UserIndex,
    ) -> Result<String, CoreError> {
        if query.trim().is_empty() {
            return Err(CoreError::invalid_argument("query must not be empty"));
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                CoreError::Upstream("embedding provider returned no vector".to_string())
            })?;

        let hits = index.search(
            &query_embedding,
            self.top_k,
            filter.map(|f| f.category.as_str()),
        );
        tracing::debug!(
            "Retrieved {} chunks for user {} (filter: {:?})",
            hits.len(),
            index.user_id(),
            filter.map(|f| &f.category)
        );

        let prompt = build_prompt(query, &hits);
        self.generate_with_retry(&prompt).await
    }

    /// One-line description of a chat's opening question, used when a new
    /// chat row is created.
    pub async fn summarize(&self, text: &str) -> Result<String, CoreError> {
        let prompt = format!(
            "Summarize the following message as a short chat title of at most \
             eight words. Reply with the title only.\n\n{}",
            text
        );
        self.generate_with_retry(&prompt).await
    }

    /// Call the generation provider, retrying upstream failures a small
    /// fixed number of times before surfacing the error unchanged.
    async fn generate_with_retry(&self, prompt: &str) -> Result<String, CoreError> {
        let mut attempts = 0;
        loop {
            match self.generator.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(CoreError::Upstream(message)) if attempts < self.max_retries => {
                    attempts += 1;
                    tracing::warn!(
                        "Generation attempt {}/{} failed: {}",
                        attempts,
                        self.max_retries,
                        message
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn build_prompt(query: &str, hits: &[ScoredChunk]) -> String {
    let context = if hits.is_empty() {
        EMPTY_CONTEXT_MARKER.to_string()
    } else {
        hits.iter()
            .enumerate()
            .map(|(i, hit)| {
                format!(
                    "[{}] (source: {})\n{}",
                    i + 1,
                    hit.entry.metadata.source,
                    hit.entry.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "{}\n\nDocuments:\n{}\n\nQuestion: {}\n\nAnswer:",
        ANSWER_INSTRUCTION, context, query
    )
}
