//! Reducing per-token hidden states to one sentence vector.

use ndarray::{ArrayView2, Axis};

/// How token hidden states are collapsed into a sentence embedding.
///
/// Sentence-transformers encoders such as `all-mpnet-base-v2` are trained with
/// [`Mean`](PoolingStrategy::Mean). BERT classifiers use [`Cls`](PoolingStrategy::Cls) and
/// decoder-style embedders use [`LastToken`](PoolingStrategy::LastToken).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PoolingStrategy {
    /// Average of the hidden states of all attended tokens.
    #[default]
    Mean,

    /// Hidden state of the first token.
    Cls,

    /// Hidden state of the last attended token.
    LastToken,
}

impl PoolingStrategy {
    /// Pools `hidden_states` of shape `[seq_len, hidden_dim]`.
    ///
    /// `attention_mask` marks real tokens with non-zero values. An all-zero mask yields a zero
    /// vector for [`Mean`](Self::Mean).
    #[must_use]
    pub fn apply(self, hidden_states: ArrayView2<'_, f32>, attention_mask: &[u32]) -> Vec<f32> {
        let (seq_len, hidden_dim) = hidden_states.dim();
        match self {
            Self::Mean => {
                let mut sum = vec![0.0f32; hidden_dim];
                let mut attended = 0u32;
                for (row, _) in hidden_states
                    .axis_iter(Axis(0))
                    .zip(attention_mask)
                    .filter(|(_, mask)| **mask != 0)
                {
                    attended += 1;
                    for (acc, value) in sum.iter_mut().zip(row) {
                        *acc += value;
                    }
                }
                if attended > 0 {
                    #[allow(clippy::cast_precision_loss)]
                    let count = attended as f32;
                    sum.iter_mut().for_each(|value| *value /= count);
                }
                sum
            }
            Self::Cls => hidden_states.row(0).to_vec(),
            Self::LastToken => {
                let last = attention_mask
                    .iter()
                    .rposition(|&mask| mask != 0)
                    .unwrap_or(seq_len.saturating_sub(1));
                hidden_states.row(last).to_vec()
            }
        }
    }
}
