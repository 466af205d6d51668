//! Wiring of the LanceDB-backed engine from settings.

use std::sync::Arc;

use tracing::info;

use chatrag_core::config::Settings;
use chatrag_core::error::Result;
use chatrag_core::traits::EmbeddingProvider;
use chatrag_embed::get_default_embedder;
use chatrag_text::{Bm25Params, Normalizer};
use chatrag_vector::{open_db, LanceDenseIndex, LanceSparseStore};

use crate::engine::HybridSearchEngine;

pub type LanceEngine = HybridSearchEngine<LanceDenseIndex, LanceSparseStore>;

/// Opens both tables (creating them when absent), loads the embedder and
/// performs the initial lexical reload.
pub async fn open_engine(settings: &Settings) -> Result<LanceEngine> {
    let uri = settings.storage_path();
    let conn = open_db(&uri.to_string_lossy()).await?;
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::from(get_default_embedder(&settings.embedding)?);
    let dense = LanceDenseIndex::open(&conn, &settings.storage.dense_table, embedder.dim()).await?;
    let sparse = LanceSparseStore::open(&conn, &settings.storage.sparse_table).await?;
    let normalizer = Normalizer::for_language(&settings.lexical.language)?;
    let params = Bm25Params { k1: settings.lexical.k1, b: settings.lexical.b };

    let engine = HybridSearchEngine::new(dense, sparse, embedder, normalizer, params)
        .with_k_rrf(settings.retrieval.k_rrf)
        .with_scan_limit(settings.retrieval.scan_limit);
    let documents = engine.reload_lexical().await?;
    info!(uri = %uri.display(), documents, "engine ready");
    Ok(engine)
}
