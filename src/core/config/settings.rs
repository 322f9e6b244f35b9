use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::paths::AppPaths;
use crate::core::errors::CoreError;

const DEFAULT_TAG_SECRET: &str = "9vTL8BbSTyGsYXeR3kZPjA==";
const DEFAULT_EMBED_MODEL: &str = "models/embedding-001";
const DEFAULT_GENERATION_MODEL: &str = "llama-3.1-70b-versatile";
const DEFAULT_CAPTION_BASE_URL: &str = "https://video.google.com/timedtext";

/// Explicit configuration object for the whole backend.
///
/// Loaded once at startup from the process environment (with an optional
/// `secrets.yaml` underneath) and validated before any component is built.
/// Components receive the values they need at construction and never read
/// the environment mid-operation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Process-wide secret keying the source-tag derivation.
    pub tag_secret: String,
    /// Credential for the embedding provider.
    pub google_api_key: Option<String>,
    pub embed_model: String,
    /// Credential for the generation provider.
    pub groq_api_key: Option<String>,
    pub generation_model: String,
    /// Remote PDF-to-markdown parse service.
    pub pdf_parse_url: Option<String>,
    pub pdf_parse_api_key: Option<String>,
    /// Caption track endpoint for video ingestion.
    pub caption_base_url: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,
    pub generation_max_retries: usize,
    pub web_timeout_secs: u64,
}

/// Subset of settings that may live in `secrets.yaml` instead of the
/// environment.
#[derive(Debug, Default, Deserialize)]
struct SecretsFile {
    tag_secret: Option<String>,
    google_api_key: Option<String>,
    groq_api_key: Option<String>,
    pdf_parse_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tag_secret: DEFAULT_TAG_SECRET.to_string(),
            google_api_key: None,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            groq_api_key: None,
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            pdf_parse_url: None,
            pdf_parse_api_key: None,
            caption_base_url: DEFAULT_CAPTION_BASE_URL.to_string(),
            chunk_size: 2000,
            chunk_overlap: 1000,
            retrieval_top_k: 10,
            generation_max_retries: 2,
            web_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from `secrets.yaml` (if present) and the process
    /// environment, environment taking precedence.
    pub fn load(paths: &AppPaths) -> Self {
        let _ = dotenvy::dotenv();

        let mut settings = Settings::default();
        let secrets = load_secrets_file(&paths.secrets_path);

        if let Some(secret) = secrets.tag_secret {
            settings.tag_secret = secret;
        }
        settings.google_api_key = secrets.google_api_key;
        settings.groq_api_key = secrets.groq_api_key;
        settings.pdf_parse_api_key = secrets.pdf_parse_api_key;

        if let Ok(secret) = env::var("RECALL_TAG_SECRET") {
            settings.tag_secret = secret;
        }
        if let Ok(key) = env::var("GOOGLE_API_KEY") {
            settings.google_api_key = Some(key);
        }
        if let Ok(model) = env::var("RECALL_EMBED_MODEL") {
            settings.embed_model = model;
        }
        if let Ok(key) = env::var("GROQ_API_KEY") {
            settings.groq_api_key = Some(key);
        }
        if let Ok(model) = env::var("RECALL_GENERATION_MODEL") {
            settings.generation_model = model;
        }
        if let Ok(url) = env::var("RECALL_PDF_PARSE_URL") {
            settings.pdf_parse_url = Some(url);
        }
        if let Ok(key) = env::var("RECALL_PDF_PARSE_API_KEY") {
            settings.pdf_parse_api_key = Some(key);
        }
        if let Ok(url) = env::var("RECALL_CAPTION_BASE_URL") {
            settings.caption_base_url = url;
        }
        if let Some(size) = env_usize("RECALL_CHUNK_SIZE") {
            settings.chunk_size = size;
        }
        if let Some(overlap) = env_usize("RECALL_CHUNK_OVERLAP") {
            settings.chunk_overlap = overlap;
        }
        if let Some(top_k) = env_usize("RECALL_RETRIEVAL_TOP_K") {
            settings.retrieval_top_k = top_k;
        }

        settings
    }

    /// Validate the tunables once, before anything is constructed from them.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.chunk_size == 0 {
            return Err(CoreError::InvalidConfiguration(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(CoreError::InvalidConfiguration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.retrieval_top_k == 0 {
            return Err(CoreError::InvalidConfiguration(
                "retrieval top-k must be positive".to_string(),
            ));
        }
        if self.tag_secret.trim().is_empty() {
            return Err(CoreError::InvalidConfiguration(
                "tag secret must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn require_google_api_key(&self) -> Result<&str, CoreError> {
        require_credential(self.google_api_key.as_deref(), "GOOGLE_API_KEY")
    }

    pub fn require_groq_api_key(&self) -> Result<&str, CoreError> {
        require_credential(self.groq_api_key.as_deref(), "GROQ_API_KEY")
    }
}

fn require_credential<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, CoreError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(CoreError::Configuration(format!("{} is not set", name))),
    }
}

fn load_secrets_file(path: &Path) -> SecretsFile {
    if !path.exists() {
        return SecretsFile::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str(&contents).unwrap_or_default(),
        Err(_) => SecretsFile::default(),
    }
}

fn env_usize(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn overlap_not_below_chunk_size_is_rejected() {
        let settings = Settings {
            chunk_size: 1000,
            chunk_overlap: 1000,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn missing_credentials_surface_as_configuration_errors() {
        let settings = Settings::default();
        assert!(matches!(
            settings.require_google_api_key(),
            Err(CoreError::Configuration(_))
        ));
        assert!(matches!(
            settings.require_groq_api_key(),
            Err(CoreError::Configuration(_))
        ));

        let with_keys = Settings {
            google_api_key: Some("g".to_string()),
            groq_api_key: Some("q".to_string()),
            ..Settings::default()
        };
        assert_eq!(with_keys.require_google_api_key().unwrap(), "g");
        assert_eq!(with_keys.require_groq_api_key().unwrap(), "q");
    }
}
