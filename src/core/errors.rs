use thiserror::Error;

/// Error taxonomy for the ingestion and retrieval core.
///
/// Every variant is surfaced to the immediate caller unchanged; only
/// generation-provider failures are retried (see `query::QueryEngine`)
/// before they reach the caller as `Upstream`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad caller input (mismatched lengths, duplicate ids, empty query).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Bad tunable, e.g. chunk overlap not smaller than chunk size.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A required credential or endpoint is absent from the settings.
    #[error("missing configuration: {0}")]
    Configuration(String),
    /// The persisted index or relational store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
    /// An external provider call failed, including exhausted retries.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl CoreError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CoreError::InvalidArgument(msg.into())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        CoreError::Storage(err.to_string())
    }

    pub fn upstream<E: std::fmt::Display>(err: E) -> Self {
        CoreError::Upstream(err.to_string())
    }
}
