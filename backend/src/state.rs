use std::sync::Arc;

use anyhow::{Context, Result};
use song_catalog_shared::song_store::SongRepository;

use crate::metadata_client::MetadataClient;

#[derive(Clone)]
pub struct AppState {
    /// Catalog persistence, blocking calls only
    store: Arc<dyn SongRepository>,
    /// Enrichment lookups
    metadata: MetadataClient,
}

impl AppState {
    pub fn new(store: Arc<dyn SongRepository>, metadata: MetadataClient) -> Self {
        Self { store, metadata }
    }

    pub fn metadata(&self) -> &MetadataClient {
        &self.metadata
    }

    /// Runs one store call on the blocking pool.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn SongRepository) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .context("song store task failed")?
    }
}
