use std::path::Path;

use ecfr_core::traits::{Embedder, VectorIndex};
use ecfr_core::types::{Chunk, QueryHit, RunMetadata};
use ecfr_core::{Error, PipelineConfig, Result};

use crate::index::FlatL2Index;
use crate::store::ArtifactStore;

const DEFAULT_TOP_K: usize = 5;

/// Read side of the latest committed run.
pub struct QueryService {
    embedder: Box<dyn Embedder>,
    index: FlatL2Index,
    chunks: Vec<Chunk>,
    metadata: RunMetadata,
    top_k_default: usize,
}

impl QueryService {
    pub fn open(output_root: &Path, embedder: Box<dyn Embedder>) -> Result<Self> {
        let store = ArtifactStore::new(output_root);
        let metadata = store.latest_metadata()?;
        if metadata.model_name != embedder.model_name() {
            return Err(Error::InvalidConfig(format!(
                "index was built with {} but the query embedder is {}",
                metadata.model_name,
                embedder.model_name()
            )));
        }
        let index = store.load_index(&metadata)?;
        if index.dim() != embedder.dim() {
            return Err(Error::DimensionMismatch { expected: index.dim(), actual: embedder.dim() });
        }
        let chunks = store.load_chunks(&metadata)?;
        if chunks.len() != index.len() {
            tracing::warn!("Chunk list has {} rows but index has {}", chunks.len(), index.len());
        }
        tracing::info!("Loaded vector database {} ({} chunks)", metadata.timestamp, chunks.len());
        Ok(Self { embedder, index, chunks, metadata, top_k_default: DEFAULT_TOP_K })
    }

    pub fn with_top_k_default(mut self, k: usize) -> Self {
        if k > 0 {
            self.top_k_default = k;
        }
        self
    }

    pub fn metadata(&self) -> &RunMetadata { &self.metadata }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    /// Ranked hits, best first. `top_k == 0` means the default.
    pub fn search(&self, text: &str, top_k: usize) -> Result<Vec<QueryHit>> {
        let k = if top_k == 0 { self.top_k_default } else { top_k };
        let mut vectors = self
            .embedder
            .embed_batch(&[text.to_string()])
            .map_err(|e| Error::Operation(format!("query embedding failed: {:#}", e)))?;
        let query = match vectors.pop() {
            Some(v) if vectors.is_empty() => v,
            _ => return Err(Error::Operation("embedder returned no vector for the query".into())),
        };

        let neighbors = self.index.search(&query, k)?;
        let hits = neighbors
            .into_iter()
            .filter_map(|n| match self.chunks.get(n.row) {
                Some(chunk) => Some(QueryHit::new(chunk, n)),
                None => {
                    let desync = Error::Desync { row: n.row, len: self.chunks.len() };
                    tracing::warn!("Dropping hit: {}", desync);
                    None
                }
            })
            .collect();
        Ok(hits)
    }
}

/// Open the latest run and search it; failures are logged and yield no hits.
pub fn query_latest(config: &PipelineConfig, embedder: Box<dyn Embedder>, text: &str, top_k: usize) -> Vec<QueryHit> {
    let result = QueryService::open(&config.output_root_path(), embedder)
        .map(|svc| svc.with_top_k_default(config.top_k_default))
        .and_then(|svc| svc.search(text, top_k));
    match result {
        Ok(hits) => hits,
        Err(Error::NotFound(msg)) => {
            tracing::error!("Vector database not found: {}", msg);
            Vec::new()
        }
        Err(e) => {
            tracing::error!("Query failed: {}", e);
            Vec::new()
        }
    }
}
