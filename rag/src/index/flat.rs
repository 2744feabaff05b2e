//! Exact brute-force index over row-major vector storage.

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::error::{Position, RagError, Result};
use crate::types::Neighbor;

use super::{VectorIndex, squared_euclidean};

/// Exact k-NN index under squared Euclidean distance.
///
/// Vectors are stored contiguously, one row per document, in insertion order. Every search scores
/// all rows in parallel and keeps the `k` smallest under the total order `(distance, id)`, so equal
/// distances always rank the lower identifier first and repeated searches return identical results.
///
/// Cost is O(N·D) per query, which is fine for corpora of a few hundred documents.
///
/// # Example
///
/// ```rust
/// use casebrief_rag::index::{FlatIndex, VectorIndex};
///
/// let index = FlatIndex::build([vec![0.0, 0.0], vec![1.0, 1.0], vec![5.0, 5.0]]).unwrap();
/// let hits = index.search(&[0.9, 0.9], 2).unwrap();
/// assert_eq!(hits[0].id, 1);
/// assert_eq!(hits[1].id, 0);
/// ```
pub struct FlatIndex {
    dimension: usize,
    len: usize,
    vectors: Vec<f32>,
}

impl std::fmt::Debug for FlatIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatIndex")
            .field("dimension", &self.dimension)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl FlatIndex {
    /// Builds an index from embeddings in corpus order.
    ///
    /// The first embedding fixes the dimensionality.
    ///
    /// # Errors
    /// - [`RagError::EmptyCorpus`] if `embeddings` is empty
    /// - [`RagError::DimensionMismatch`] if any embedding differs in length from the first
    /// - [`RagError::InvalidArgument`] for zero-length embeddings or non-finite components
    pub fn build<I, E>(embeddings: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: AsRef<[f32]>,
    {
        let mut embeddings = embeddings.into_iter();
        let first = embeddings.next().ok_or(RagError::EmptyCorpus)?;
        let dimension = first.as_ref().len();
        if dimension == 0 {
            return Err(RagError::InvalidArgument(
                "embeddings must have at least one component".into(),
            ));
        }

        let (lower, _) = embeddings.size_hint();
        let mut index = Self {
            dimension,
            len: 0,
            vectors: Vec::with_capacity((lower + 1) * dimension),
        };
        index.push(first.as_ref())?;
        for embedding in embeddings {
            index.push(embedding.as_ref())?;
        }
        Ok(index)
    }

    fn push(&mut self, embedding: &[f32]) -> Result<()> {
        let position = Position::Corpus(self.len);
        if embedding.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                position,
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        ensure_finite(embedding, position)?;
        self.vectors.extend_from_slice(embedding);
        self.len += 1;
        Ok(())
    }

    /// Returns the stored embedding for `id`.
    #[must_use]
    pub fn embedding(&self, id: usize) -> Option<&[f32]> {
        (id < self.len).then(|| &self.vectors[id * self.dimension..(id + 1) * self.dimension])
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                position: Position::Query,
                expected: self.dimension,
                actual: query.len(),
            });
        }
        ensure_finite(query, Position::Query)?;

        let k = k.clamp(1, self.len);
        let mut scored: Vec<(OrderedFloat<f32>, usize)> = self
            .vectors
            .par_chunks_exact(self.dimension)
            .enumerate()
            .map(|(id, row)| (OrderedFloat(squared_euclidean(row, query)), id))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable(k - 1);
            scored.truncate(k);
        }
        scored.sort_unstable();

        tracing::debug!(k, candidates = self.len, "flat index search");
        Ok(scored
            .into_iter()
            .map(|(distance, id)| Neighbor {
                id,
                distance: distance.into_inner(),
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.len
    }
}

fn ensure_finite(vector: &[f32], position: Position) -> Result<()> {
    if vector.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(RagError::InvalidArgument(format!(
            "embedding for {position} contains non-finite values"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> FlatIndex {
        FlatIndex::build([
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 2.0],
            vec![3.0, 3.0],
            vec![-1.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let result = FlatIndex::build(Vec::<Vec<f32>>::new());
        assert!(matches!(result, Err(RagError::EmptyCorpus)));
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let mut embeddings = vec![vec![0.5; 8]; 4];
        embeddings.insert(2, vec![0.5; 10]);
        let result = FlatIndex::build(embeddings);
        assert!(matches!(
            result,
            Err(RagError::DimensionMismatch {
                position: Position::Corpus(2),
                expected: 8,
                actual: 10,
            })
        ));
    }

    #[test]
    fn non_finite_components_are_rejected() {
        let result = FlatIndex::build([vec![0.0, 1.0], vec![f32::NAN, 1.0]]);
        assert!(matches!(result, Err(RagError::InvalidArgument(_))));
    }

    #[test]
    fn results_are_sorted_and_sized() {
        let index = grid();
        for k in 1..=5 {
            let hits = index.search(&[0.2, 0.1], k).unwrap();
            assert_eq!(hits.len(), k);
            assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }

    #[test]
    fn k_is_clamped_to_corpus_size() {
        let index = grid();
        assert_eq!(index.search(&[0.0, 0.0], 1000).unwrap().len(), 5);
        assert_eq!(index.search(&[0.0, 0.0], 0).unwrap().len(), 1);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn stored_vector_retrieves_itself_first() {
        let index = grid();
        for id in 0..index.len() {
            let query = index.embedding(id).unwrap().to_vec();
            let hits = index.search(&query, 3).unwrap();
            assert_eq!(hits[0].id, id);
            assert_eq!(hits[0].distance, 0.0);
        }
    }

    #[test]
    fn equal_distances_prefer_lower_ids() {
        // ids 1 and 4 are both at distance 1 from the origin.
        let index = grid();
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let ids: Vec<usize> = hits.iter().map(|hit| hit.id).collect();
        assert_eq!(ids, vec![0, 1, 4]);

        let duplicates = FlatIndex::build(vec![vec![1.0, 1.0]; 6]).unwrap();
        let ids: Vec<usize> = duplicates
            .search(&[0.0, 0.0], 4)
            .unwrap()
            .iter()
            .map(|hit| hit.id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn repeated_searches_are_identical() {
        let index = grid();
        let first = index.search(&[1.5, 1.5], 4).unwrap();
        for _ in 0..10 {
            assert_eq!(index.search(&[1.5, 1.5], 4).unwrap(), first);
        }
    }

    #[test]
    fn query_dimension_is_checked() {
        let index = grid();
        let result = index.search(&[0.0, 0.0, 0.0], 2);
        assert!(matches!(
            result,
            Err(RagError::DimensionMismatch {
                position: Position::Query,
                expected: 2,
                actual: 3,
            })
        ));
    }
}
