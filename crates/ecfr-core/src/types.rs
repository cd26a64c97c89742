//! Domain types shared by the loader, chunker, index and query service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One regulation section as collected from eCFR.
///
/// Identified by `(title_number, part_number, section_number)`; never mutated
/// after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub title_number: String,
    pub title_name: String,
    pub part_number: String,
    pub section_number: String,
    pub section_title: String,
    pub content: String,
}

impl SectionRecord {
    /// Citation used to label every chunk cut from this section.
    pub fn source_label(&self) -> String {
        format!(
            "Title {}, Part {}, Section {}",
            self.title_number, self.part_number, self.section_number
        )
    }
}

/// A window of section text; the unit that gets embedded and retrieved.
///
/// Row `i` of a persisted chunk list corresponds to row `i` of the embedding
/// matrix and of the index built in the same run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub title_number: String,
    pub title_name: String,
    pub part_number: String,
    pub section_number: String,
    pub section_title: String,
    pub text: String,
    pub source: String,
}

impl Chunk {
    pub fn from_section(section: &SectionRecord, text: String) -> Self {
        Self {
            title_number: section.title_number.clone(),
            title_name: section.title_name.clone(),
            part_number: section.part_number.clone(),
            section_number: section.section_number.clone(),
            section_title: section.section_title.clone(),
            text,
            source: section.source_label(),
        }
    }
}

/// A row returned by a nearest-neighbor search. Distance is squared L2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

impl Neighbor {
    /// Display score in `(0, 1]`; ranking always uses `distance`.
    pub fn score(&self) -> f32 {
        1.0 / (1.0 + self.distance)
    }
}

/// Paths of every artifact written by one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFiles {
    pub text_chunks: PathBuf,
    pub embeddings: PathBuf,
    pub index: PathBuf,
    pub latest_text_chunks: PathBuf,
    pub latest_embeddings: PathBuf,
    pub latest_index: PathBuf,
}

/// Run-level descriptor persisted as JSON next to the artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub timestamp: String,
    pub model_name: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub num_chunks: usize,
    pub embedding_dim: usize,
    pub files: ArtifactFiles,
    /// blake3 over chunk sources and texts, in order.
    #[serde(default)]
    pub chunks_digest: String,
}

/// One ranked answer from the query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub score: f32,
    pub distance: f32,
    pub source: String,
    #[serde(rename = "title_num")]
    pub title_number: String,
    pub title_name: String,
    #[serde(rename = "part_num")]
    pub part_number: String,
    #[serde(rename = "section_num")]
    pub section_number: String,
    pub section_title: String,
    pub text: String,
}

impl QueryHit {
    pub fn new(chunk: &Chunk, neighbor: Neighbor) -> Self {
        Self {
            score: neighbor.score(),
            distance: neighbor.distance,
            source: chunk.source.clone(),
            title_number: chunk.title_number.clone(),
            title_name: chunk.title_name.clone(),
            part_number: chunk.part_number.clone(),
            section_number: chunk.section_number.clone(),
            section_title: chunk.section_title.clone(),
            text: chunk.text.clone(),
        }
    }
}
