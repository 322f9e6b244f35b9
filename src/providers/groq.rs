use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::GenerationProvider;
use crate::core::config::Settings;
use crate::core::errors::CoreError;

const CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const TEMPERATURE: f64 = 0.6;

/// OpenAI-compatible chat-completion client against the Groq API.
pub struct GroqGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl GroqGenerator {
    /// Fails with `Configuration` when the API key is absent.
    pub fn new(settings: &Settings) -> Result<Self, CoreError> {
        let api_key = settings.require_groq_api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.web_timeout_secs.max(60)))
            .build()
            .map_err(CoreError::upstream)?;

        Ok(GroqGenerator {
            client,
            api_key,
            model: settings.generation_model.clone(),
        })
    }
}

#[async_trait]
impl GenerationProvider for GroqGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, CoreError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": TEMPERATURE,
            "stream": false,
        });

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(CoreError::upstream)?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(CoreError::Upstream(format!(
                "generation request returned {}: {}",
                status, detail
            )));
        }

        let payload: Value = response.json().await.map_err(CoreError::upstream)?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                CoreError::Upstream("generation response missing content".to_string())
            })?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let settings = Settings::default();
        assert!(matches!(
            GroqGenerator::new(&settings),
            Err(CoreError::Configuration(_))
        ));
    }
}
