use std::sync::Arc;

use crate::auth::UserStore;
use crate::core::config::{AppPaths, Settings};
use crate::core::errors::CoreError;
use crate::extract::{
    DisabledPdfExtractor, HttpPageExtractor, PdfExtractor, RemoteParsePdfExtractor,
    TimedTextCaptionExtractor,
};
use crate::history::ChatStore;
use crate::index::{IndexManager, SqliteIndexStore};
use crate::ingest::{Chunker, IngestService};
use crate::providers::{GeminiEmbeddings, GroqGenerator};
use crate::query::QueryEngine;

/// Application composition root shared by everything built on this crate.
///
/// Construction validates the settings once and hands each component its
/// dependencies; nothing reads the environment after this point.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<Settings>,
    pub index: Arc<IndexManager>,
    pub ingest: Arc<IngestService>,
    pub query: Arc<QueryEngine>,
    pub chats: ChatStore,
    pub users: UserStore,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, CoreError> {
        let paths = Arc::new(AppPaths::new());
        let settings = Arc::new(Settings::load(&paths));
        Self::with_settings(paths, settings).await
    }

    pub async fn with_settings(
        paths: Arc<AppPaths>,
        settings: Arc<Settings>,
    ) -> Result<Arc<Self>, CoreError> {
        settings.validate()?;

        let embedder = Arc::new(GeminiEmbeddings::new(&settings)?);
        let generator = Arc::new(GroqGenerator::new(&settings)?);

        let index_store = SqliteIndexStore::with_path(paths.index_db_path.clone()).await?;
        let index = Arc::new(IndexManager::new(Arc::new(index_store), embedder.clone()));

        let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap)?;
        let pages = Arc::new(HttpPageExtractor::new(settings.web_timeout_secs)?);
        let captions = Arc::new(TimedTextCaptionExtractor::new(
            settings.caption_base_url.clone(),
            settings.web_timeout_secs,
        )?);
        // PDF parsing is optional: without a parse endpoint only the PDF
        // operation fails, not startup.
        let pdf: Arc<dyn PdfExtractor> = if settings.pdf_parse_url.is_some() {
            Arc::new(RemoteParsePdfExtractor::new(&settings)?)
        } else {
            Arc::new(DisabledPdfExtractor)
        };

        let ingest = Arc::new(IngestService::new(
            chunker,
            settings.tag_secret.as_bytes().to_vec(),
            index.clone(),
            pages,
            captions,
            pdf,
        ));

        let query = Arc::new(QueryEngine::new(
            embedder,
            generator,
            settings.retrieval_top_k,
            settings.generation_max_retries,
        ));

        let chats = ChatStore::with_path(paths.chat_db_path.clone()).await?;
        let users = UserStore::with_path(paths.chat_db_path.clone()).await?;

        Ok(Arc::new(AppState {
            paths,
            settings,
            index,
            ingest,
            query,
            chats,
            users,
        }))
    }
}
