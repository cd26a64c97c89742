//! On-disk artifacts of a build run.
//!
//! Every file goes through a temp file in the output root plus an atomic
//! rename. `latest_metadata.json` is written last and is the only thing a
//! reader trusts; the other `latest_*` files are convenience copies.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ecfr_core::traits::VectorIndex;
use ecfr_core::types::{ArtifactFiles, Chunk, RunMetadata};
use ecfr_core::{Error, Result};
use tempfile::NamedTempFile;

use crate::codec;
use crate::index::FlatL2Index;

pub const LATEST_METADATA: &str = "latest_metadata.json";
pub const LATEST_TEXT_CHUNKS: &str = "latest_text_chunks.json";
pub const LATEST_EMBEDDINGS: &str = "latest_embeddings.bin";
pub const LATEST_INDEX: &str = "latest_flat_index.bin";

/// Everything produced by one run, ready to be committed.
pub struct RunArtifacts<'a> {
    pub timestamp: &'a str,
    pub model_name: &'a str,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunks: &'a [Chunk],
    pub embeddings: &'a [Vec<f32>],
    pub index: &'a FlatL2Index,
}

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path { &self.root }

    pub fn latest_metadata_path(&self) -> PathBuf {
        self.root.join(LATEST_METADATA)
    }

    /// Write the timestamped files, then the latest aliases, then the latest
    /// metadata pointer.
    pub fn commit(&self, run: &RunArtifacts<'_>) -> Result<RunMetadata> {
        fs::create_dir_all(&self.root)?;
        let ts = run.timestamp;
        let dim = run.index.dim();

        let chunks_json = serde_json::to_vec_pretty(run.chunks)?;
        let embeddings_bin = codec::encode_embeddings(run.embeddings, dim);
        let index_bin = run.index.to_bytes();

        let text_chunks = self.write_atomic(&format!("text_chunks_{}.json", ts), &chunks_json)?;
        let embeddings = self.write_atomic(&format!("embeddings_{}.bin", ts), &embeddings_bin)?;
        let index = self.write_atomic(&format!("flat_index_{}.bin", ts), &index_bin)?;

        let metadata = RunMetadata {
            timestamp: ts.to_string(),
            model_name: run.model_name.to_string(),
            chunk_size: run.chunk_size,
            chunk_overlap: run.chunk_overlap,
            num_chunks: run.chunks.len(),
            embedding_dim: dim,
            files: ArtifactFiles {
                text_chunks,
                embeddings,
                index,
                latest_text_chunks: self.root.join(LATEST_TEXT_CHUNKS),
                latest_embeddings: self.root.join(LATEST_EMBEDDINGS),
                latest_index: self.root.join(LATEST_INDEX),
            },
            chunks_digest: chunks_digest(run.chunks),
        };
        let metadata_json = serde_json::to_vec_pretty(&metadata)?;
        self.write_atomic(&format!("vector_db_metadata_{}.json", ts), &metadata_json)?;

        self.write_atomic(LATEST_TEXT_CHUNKS, &chunks_json)?;
        self.write_atomic(LATEST_EMBEDDINGS, &embeddings_bin)?;
        self.write_atomic(LATEST_INDEX, &index_bin)?;
        self.write_atomic(LATEST_METADATA, &metadata_json)?;

        tracing::info!("Vector database saved to {} (run {})", self.root.display(), ts);
        Ok(metadata)
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.root.join(name);
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
        tracing::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    pub fn latest_metadata(&self) -> Result<RunMetadata> {
        let path = self.latest_metadata_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("no vector database metadata at {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| Error::Artifact { path, reason: e.to_string() })
    }

    pub fn load_chunks(&self, metadata: &RunMetadata) -> Result<Vec<Chunk>> {
        let path = self.locate(&metadata.files.text_chunks)?;
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|e| Error::Artifact { path, reason: e.to_string() })
    }

    pub fn load_embeddings(&self, metadata: &RunMetadata) -> Result<Vec<Vec<f32>>> {
        let path = self.locate(&metadata.files.embeddings)?;
        codec::decode_embeddings(&fs::read(&path)?, &path)
    }

    pub fn load_index(&self, metadata: &RunMetadata) -> Result<FlatL2Index> {
        let path = self.locate(&metadata.files.index)?;
        FlatL2Index::from_bytes(&fs::read(&path)?, &path)
    }

    /// Recorded path if it exists, else the same file name under this root
    /// (the output directory may have been moved).
    fn locate(&self, recorded: &Path) -> Result<PathBuf> {
        if recorded.is_file() {
            return Ok(recorded.to_path_buf());
        }
        let relocated = recorded.file_name().map(|name| self.root.join(name));
        match relocated {
            Some(p) if p.is_file() => Ok(p),
            _ => Err(Error::NotFound(format!("artifact {} is missing", recorded.display()))),
        }
    }
}

/// blake3 over `source \0 text \0` for every chunk, in order.
pub fn chunks_digest(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in chunks {
        hasher.update(c.source.as_bytes());
        hasher.update(&[0]);
        hasher.update(c.text.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}
