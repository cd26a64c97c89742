use std::time::Instant;

use ecfr_core::traits::{Embedder, VectorIndex};
use ecfr_core::types::{RunMetadata, SectionRecord};
use ecfr_core::{Chunker, CorpusLoader, Error, PipelineConfig, Result};

use crate::index::FlatL2Index;
use crate::store::{ArtifactStore, RunArtifacts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built(RunMetadata),
    /// No sections or no chunks; nothing was written.
    Empty,
}

/// load -> chunk -> embed -> index -> persist, sequentially.
pub struct BuildPipeline<'a> {
    config: PipelineConfig,
    embedder: &'a dyn Embedder,
}

impl<'a> BuildPipeline<'a> {
    pub fn new(config: PipelineConfig, embedder: &'a dyn Embedder) -> Self {
        Self { config, embedder }
    }

    pub fn config(&self) -> &PipelineConfig { &self.config }

    pub fn run(&self) -> Result<BuildOutcome> {
        self.run_limited(None)
    }

    pub fn run_limited(&self, limit: Option<usize>) -> Result<BuildOutcome> {
        self.config.validate()?;
        let loader = CorpusLoader::from_config(&self.config);
        let (sections, _) = loader.load_with_stats(limit);
        self.build(&sections)
    }

    pub fn build(&self, sections: &[SectionRecord]) -> Result<BuildOutcome> {
        let started = Instant::now();
        if sections.is_empty() {
            tracing::warn!("No sections loaded; vector database not built");
            return Ok(BuildOutcome::Empty);
        }

        let chunks = Chunker::from_config(&self.config).chunk_corpus(sections);
        if chunks.is_empty() {
            tracing::warn!("No text chunks extracted; vector database not built");
            return Ok(BuildOutcome::Empty);
        }

        tracing::info!("Generating embeddings for {} chunks with {}", chunks.len(), self.embedder.model_name());
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).map_err(|e| {
            tracing::error!("Embedding failed: {:#}", e);
            Error::Operation(format!("embedding failed: {:#}", e))
        })?;
        if embeddings.len() != chunks.len() {
            tracing::error!("Embedder returned {} rows for {} chunks", embeddings.len(), chunks.len());
            return Err(Error::Desync { row: embeddings.len(), len: chunks.len() });
        }
        let dim = self.embedder.dim();
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, actual: bad.len() });
        }

        let index = FlatL2Index::from_vectors(dim, &embeddings)?;
        tracing::info!("Built flat L2 index with {} vectors of dimension {}", index.len(), dim);

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let store = ArtifactStore::new(self.config.output_root_path());
        let metadata = store.commit(&RunArtifacts {
            timestamp: &timestamp,
            model_name: self.embedder.model_name(),
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            chunks: &chunks,
            embeddings: &embeddings,
            index: &index,
        })?;
        tracing::info!("Build finished in {:.1?}", started.elapsed());
        Ok(BuildOutcome::Built(metadata))
    }
}
