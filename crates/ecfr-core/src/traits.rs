use crate::types::Neighbor;

/// A sentence-embedding model, loaded once and reused for a whole batch.
pub trait Embedder: Send + Sync {
    /// Name recorded in run metadata; queries must use the same model.
    fn model_name(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Output rows are in input order. Empty input yields an empty matrix.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Exact nearest-neighbor search over positionally addressed rows.
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Append rows; row numbers continue from the current length.
    fn add(&mut self, vectors: &[Vec<f32>]) -> crate::Result<()>;
    /// Up to `k` rows ordered by ascending distance.
    fn search(&self, query: &[f32], k: usize) -> crate::Result<Vec<Neighbor>>;
}
