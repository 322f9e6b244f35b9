use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;

use super::PdfExtractor;
use crate::core::config::Settings;
use crate::core::errors::CoreError;

/// Uploads a PDF to a remote markdown-parse service and concatenates the
/// returned page texts.
pub struct RemoteParsePdfExtractor {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RemoteParsePdfExtractor {
    /// Fails with `Configuration` when the parse endpoint or its credential
    /// is absent from the settings.
    pub fn new(settings: &Settings) -> Result<Self, CoreError> {
        let endpoint = settings
            .pdf_parse_url
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                CoreError::Configuration("RECALL_PDF_PARSE_URL is not set".to_string())
            })?;
        let api_key = settings
            .pdf_parse_api_key
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                CoreError::Configuration("RECALL_PDF_PARSE_API_KEY is not set".to_string())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.web_timeout_secs.max(60)))
            .build()
            .map_err(CoreError::upstream)?;

        Ok(RemoteParsePdfExtractor {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl PdfExtractor for RemoteParsePdfExtractor {
    async fn extract_pdf(&self, path: &Path) -> Result<(String, String), CoreError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::invalid_argument("pdf path has no file name"))?
            .to_string();

        let bytes = tokio::fs::read(path).await.map_err(CoreError::storage)?;
        let part = Part::bytes(bytes)
            .file_name(name.clone())
            .mime_str("application/pdf")
            .map_err(CoreError::upstream)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(CoreError::upstream)?;

        if !response.status().is_success() {
            return Err(CoreError::Upstream(format!(
                "pdf parse service returned {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(CoreError::upstream)?;
        Ok((name, concatenate_pages(&payload)))
    }
}

/// Stand-in used when no parse service is configured: every call fails
/// with the missing-configuration error instead of blocking startup.
pub struct DisabledPdfExtractor;

#[async_trait]
impl PdfExtractor for DisabledPdfExtractor {
    async fn extract_pdf(&self, _path: &Path) -> Result<(String, String), CoreError> {
        Err(CoreError::Configuration(
            "RECALL_PDF_PARSE_URL is not set".to_string(),
        ))
    }
}

/// Join the parsed page texts into one document body. Accepts either a
/// whole-document `markdown` field or a `pages[].text` array.
fn concatenate_pages(payload: &Value) -> String {
    if let Some(markdown) = payload.get("markdown").and_then(Value::as_str) {
        return markdown.to_string();
    }

    payload
        .get("pages")
        .and_then(Value::as_array)
        .map(|pages| {
            pages
                .iter()
                .filter_map(|page| page.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .unwrap_or_default()
}
