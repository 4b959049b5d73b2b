//! Exact cosine-similarity index.
//!
//! Vectors are L2-normalized when added and stored contiguously, so the inner
//! product of a stored row and a normalized query is their cosine similarity.
//! Search is an exhaustive scan; results are exact.

use std::cmp::Ordering;

use sift_core::{Error, Result};

/// Return a unit-length copy of `vector`.
///
/// A zero vector has no direction and is returned unchanged.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let mut out = vector.to_vec();
    normalize_in_place(&mut out);
    out
}

/// Normalize `vector` to unit length in place.
///
/// Returns `false` (leaving the vector untouched) when its norm is zero.
pub fn normalize_in_place(vector: &mut [f32]) -> bool {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return false;
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
    true
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Flat index of unit vectors addressed by ordinal.
///
/// Ordinal `i` is the `i`-th vector added; the metadata store uses the same
/// ordinal for the matching document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from raw embeddings, normalizing each one.
    ///
    /// An empty input yields an empty index with dimension 0.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidDimension` if the vectors do not all share the
    ///   dimension of the first one
    /// - `Error::InvalidData` for zero-length vectors or non-finite components
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };
        let dimension = first.len();
        if dimension == 0 {
            return Err(Error::invalid_data("embedding vectors must not be empty"));
        }

        let mut data = Vec::with_capacity(dimension * vectors.len());
        for (ordinal, mut vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(Error::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(Error::invalid_data(format!(
                    "embedding at ordinal {ordinal} has non-finite components"
                )));
            }
            normalize_in_place(&mut vector);
            data.extend_from_slice(&vector);
        }

        Ok(Self { dimension, data })
    }

    /// Rebuild an index from stored rows without renormalizing them.
    pub(crate) fn from_raw_parts(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            if !data.is_empty() {
                return Err(Error::invalid_data("vector data present with dimension 0"));
            }
            return Ok(Self::default());
        }
        if data.len() % dimension != 0 {
            return Err(Error::invalid_data(format!(
                "{} floats do not divide into rows of {dimension}",
                data.len()
            )));
        }
        Ok(Self { dimension, data })
    }

    /// Dimension of every stored vector (0 for an empty index).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored (normalized) vector at `ordinal`.
    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        if ordinal >= self.len() {
            return None;
        }
        let start = ordinal * self.dimension;
        self.data.get(start..start + self.dimension)
    }

    /// All stored components, row-major.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Find the `k` stored vectors most similar to `query`.
    ///
    /// Returns `(ordinal, cosine similarity)` pairs sorted by descending
    /// similarity, ties broken by ascending ordinal. At most
    /// `min(k, len)` pairs are returned; an empty index or `k == 0` yields
    /// an empty list.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if the query length differs from the
    /// index dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(Error::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(Error::embedding("query embedding has non-finite components"));
        }

        let query = normalize(query);
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, row)| (ordinal, dot(row, &query)))
            .collect();

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_by(rank);
        Ok(scored)
    }
}

fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

// ============================================================================
// Tests
// ============================================================================
