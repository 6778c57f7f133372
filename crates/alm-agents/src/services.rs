//! Process-level service container.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use alm_rag::{store_from_settings, ContextBuilder, LoaderConfig, ObjectStore, RagIndexLoader};
use alm_types::Settings;

use crate::context::retrieve_cheat_sheet_context;
use crate::embedder::{TeiEmbedder, TeiEmbedderConfig};
use crate::error::AgentError;

/// Clients shared by every request of the process.
///
/// Built once at startup with [`Services::init`] and torn down with
/// [`Services::shutdown`]; nothing is created lazily on first use.
pub struct Services {
    settings: Settings,
    store: Arc<dyn ObjectStore>,
    loader: Arc<RagIndexLoader>,
    context: ContextBuilder,
    embedder: Arc<TeiEmbedder>,
}

impl Services {
    pub fn init(settings: &Settings) -> Result<Self, AgentError> {
        let store = store_from_settings(settings)?;
        let loader = Arc::new(RagIndexLoader::new(
            store.clone(),
            LoaderConfig::from_settings(settings),
        ));
        let context = ContextBuilder::new(loader.clone());
        let embedder = Arc::new(TeiEmbedder::new(TeiEmbedderConfig::from_settings(settings))?);

        info!(
            backend = ?settings.storage.backend,
            bucket = %settings.storage.bucket,
            embeddings = %settings.embeddings.api_url,
            "Services initialized"
        );
        Ok(Self {
            settings: settings.clone(),
            store,
            loader,
            context,
            embedder,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn loader(&self) -> &Arc<RagIndexLoader> {
        &self.loader
    }

    pub fn context(&self) -> &ContextBuilder {
        &self.context
    }

    pub fn embedder(&self) -> &Arc<TeiEmbedder> {
        &self.embedder
    }

    /// Wait for a READY build using the configured poll interval and timeout.
    pub async fn wait_for_index(&self) -> bool {
        self.loader
            .wait_until_ready(
                Duration::from_secs(self.settings.rag.ready_timeout_secs),
                Duration::from_secs(self.settings.rag.poll_interval_secs),
            )
            .await
    }

    /// Context for `summary` with the configured `top_k`.
    pub async fn cheat_sheet_context(&self, summary: &str) -> Result<String, AgentError> {
        retrieve_cheat_sheet_context(
            self.embedder.as_ref(),
            &self.context,
            summary,
            self.settings.rag.top_k,
        )
        .await
    }

    /// Release the shared clients. In-flight requests holding clones finish
    /// normally; no new work should be started through this container.
    pub async fn shutdown(self) {
        let build_id = self.loader.last_loaded_build_id();
        drop(self.context);
        drop(self.embedder);
        drop(self.loader);
        drop(self.store);
        info!(last_build_id = ?build_id, "Services shut down");
    }
}
