//! Vector index implementations.
//!
//! This module provides the [`VectorIndex`] trait and the [`FlatIndex`] implementation for exact
//! nearest neighbor search over a fixed, read-only set of vectors.

mod distance;
mod flat;

pub use distance::squared_euclidean;
pub use flat::FlatIndex;

use crate::error::Result;
use crate::types::Neighbor;

/// Trait for read-only vector indexes.
///
/// Identifiers are the insertion positions `0..len()`, which line up with
/// [`CorpusStore`](crate::CorpusStore) positions.
pub trait VectorIndex: Send + Sync {
    /// Returns the `k` stored vectors closest to `query`, closest first.
    ///
    /// Implementations clamp `k` to `[1, len()]` and fail with
    /// [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch) if `query` does not have
    /// [`dimension`](Self::dimension) components.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Returns the embedding dimension.
    fn dimension(&self) -> usize;

    /// Returns the number of indexed vectors.
    fn len(&self) -> usize;

    /// Returns `true` if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
