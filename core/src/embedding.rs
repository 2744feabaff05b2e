//! # Embedding Module
//!
//! An embedding model maps a piece of text to a dense vector so that semantically similar texts land
//! close to one another. The casebrief engine embeds every corpus document once at startup and each
//! query at search time, then compares vectors by squared Euclidean distance.
//!
//! Two properties matter to the engine:
//!
//! - **Determinism**: for a fixed model version, the same text must always produce the same vector.
//!   Corpus vectors are computed once, query vectors later; they are only comparable if the model
//!   behaves as a pure function.
//! - **Fixed dimension**: every vector has the same length for the lifetime of the process.
//!
//! ```rust
//! use casebrief_core::EmbeddingModel;
//!
//! async fn example<T: EmbeddingModel>(model: &T) -> casebrief_core::Result<()> {
//!     let embedding = model.embed("Hello, world!").await?;
//!     assert_eq!(embedding.len(), model.dim());
//!     Ok(())
//! }
//! ```

use alloc::vec::Vec;
use core::future::Future;

/// A dense embedding vector of 32-bit floats.
pub type Embedding = Vec<f32>;

/// Converts text to vector representations.
///
/// # Implementation Requirements
///
/// - [`embed`](EmbeddingModel::embed) must be a pure function of its input for a fixed model version
/// - Returned vectors should have length [`dim`](EmbeddingModel::dim)
/// - Malformed input or backend failures are reported as errors, never as placeholder vectors
///
/// # Example
///
/// ```rust
/// use casebrief_core::EmbeddingModel;
///
/// struct Bag;
///
/// impl EmbeddingModel for Bag {
///     fn dim(&self) -> usize {
///         2
///     }
///
///     async fn embed(&self, text: &str) -> casebrief_core::Result<Vec<f32>> {
///         let words = text.split_whitespace().count() as f32;
///         Ok(vec![words, text.len() as f32])
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let embedding = Bag.embed("the quick brown fox").await.unwrap();
/// assert_eq!(embedding, vec![4.0, 19.0]);
/// # });
/// ```
pub trait EmbeddingModel: Send + Sync {
    /// Returns the embedding vector dimension this model advertises.
    fn dim(&self) -> usize;

    /// Converts text to an embedding vector.
    ///
    /// Heavy synchronous work belongs off the polling thread, or a deadline cannot interrupt it.
    fn embed(&self, text: &str) -> impl Future<Output = crate::Result<Embedding>> + Send;
}

impl<T: EmbeddingModel> EmbeddingModel for &T {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn embed(&self, text: &str) -> impl Future<Output = crate::Result<Embedding>> + Send {
        (**self).embed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    struct LengthEmbedding {
        dimension: usize,
    }

    impl EmbeddingModel for LengthEmbedding {
        fn dim(&self) -> usize {
            self.dimension
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
            let mut embedding = vec![0.0; self.dimension];
            for (i, value) in embedding.iter_mut().enumerate() {
                *value = (text.len() + i) as f32 * 0.5;
            }
            Ok(embedding)
        }
    }

    #[tokio::test]
    async fn embedding_matches_dimension() {
        let model = LengthEmbedding { dimension: 6 };
        let embedding = model.embed("brief").await.unwrap();
        assert_eq!(embedding.len(), model.dim());
    }

    #[tokio::test]
    #[allow(clippy::float_cmp)]
    async fn embedding_is_pure() {
        let model = LengthEmbedding { dimension: 3 };
        let first = model.embed("same input").await.unwrap();
        let second = model.embed("same input").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], 5.0);
    }

    #[tokio::test]
    async fn references_forward_to_the_model() {
        let model = LengthEmbedding { dimension: 2 };
        let by_ref = &model;
        assert_eq!(by_ref.dim(), 2);
        assert_eq!(
            by_ref.embed("ab").await.unwrap(),
            model.embed("ab").await.unwrap()
        );
    }
}
