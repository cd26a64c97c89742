use std::path::Path;

use ecfr_core::traits::VectorIndex;
use ecfr_core::types::Neighbor;
use ecfr_core::{Error, Result};

use crate::codec::{self, INDEX_MAGIC};

/// Exact brute-force index over squared Euclidean distance.
///
/// Rows are addressed by insertion position, which is what ties them back to
/// the chunk list. Ties are broken by the lower row.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn from_vectors(dim: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        let mut index = Self::new(dim);
        index.add(vectors)?;
        Ok(index)
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if self.dim == 0 {
            return None;
        }
        self.data.chunks_exact(self.dim).nth(row)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(INDEX_MAGIC, self.dim, self.len(), &self.data)
    }

    pub fn from_bytes(bytes: &[u8], path: &Path) -> Result<Self> {
        let (dim, ntotal, data) = codec::decode(INDEX_MAGIC, bytes, path)?;
        if dim == 0 && ntotal > 0 {
            return Err(Error::Artifact { path: path.to_path_buf(), reason: "zero dimension".into() });
        }
        Ok(Self { dim, data })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorIndex for FlatL2Index {
    fn dim(&self) -> usize { self.dim }

    fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: bad.len() });
        }
        self.data.reserve(vectors.len() * self.dim);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, v)| Neighbor { row, distance: nan_as_infinite(squared_l2(query, v)) })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
        scored.truncate(k);
        Ok(scored)
    }
}

/// NaN rows rank after every real distance.
fn nan_as_infinite(d: f32) -> f32 {
    if d.is_nan() { f32::INFINITY } else { d }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_distance() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }
}
