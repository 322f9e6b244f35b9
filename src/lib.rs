//! Per-user content ingestion and retrieval-augmented question answering.
//!
//! Content from web pages, video captions and PDFs is chunked, embedded
//! and appended to one vector index per user; questions are answered from
//! the ten nearest chunks (optionally filtered by category) through a
//! generation provider, with chat turns and users persisted relationally.

pub mod auth;
pub mod core;
pub mod extract;
pub mod history;
pub mod index;
pub mod ingest;
pub mod providers;
pub mod query;
pub mod state;

pub use crate::core::config::{AppPaths, Settings};
pub use crate::core::errors::CoreError;
pub use crate::state::AppState;
