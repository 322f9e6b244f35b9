use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::EmbeddingProvider;
use crate::core::config::Settings;
use crate::core::errors::CoreError;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Generative Language embedding client.
pub struct GeminiEmbeddings {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiEmbeddings {
    /// Fails with `Configuration` when the API key is absent.
    pub fn new(settings: &Settings) -> Result<Self, CoreError> {
        let api_key = settings.require_google_api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.web_timeout_secs))
            .build()
            .map_err(CoreError::upstream)?;

        Ok(GeminiEmbeddings {
            client,
            api_key,
            model: settings.embed_model.clone(),
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let url = format!(
            "{}/{}:embedContent?key={}",
            API_BASE, self.model, self.api_key
        );
        let body = json!({
            "model": self.model,
            "content": { "parts": [{ "text": text }] },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(CoreError::upstream)?;

        if !response.status().is_success() {
            return Err(CoreError::Upstream(format!(
                "embedding request returned {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(CoreError::upstream)?;
        let values = payload["embedding"]["values"]
            .as_array()
            .ok_or_else(|| {
                CoreError::Upstream("embedding response missing values".to_string())
            })?;

        Ok(values
            .iter()
            .filter_map(Value::as_f64)
            .map(|v| v as f32)
            .collect())
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text).await?);
        }
        Ok(vectors)
    }
}
