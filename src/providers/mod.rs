//! Embedding and text-generation collaborators.
//!
//! Credentials come from the validated `Settings` at construction time;
//! call failures surface as `CoreError::Upstream` and are never retried
//! here (the query engine owns the retry budget).

mod gemini;
mod groq;

use async_trait::async_trait;

use crate::core::errors::CoreError;

pub use gemini::GeminiEmbeddings;
pub use groq::GroqGenerator;

/// Turns texts into embedding vectors, one per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError>;
}

/// Produces a completion for a fully assembled prompt.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CoreError>;
}
