//! Beam search decoding for encoder-decoder models.

use std::cmp::Ordering;

/// Beam search settings.
///
/// Defaults follow the generation config commonly shipped with T5 summarization checkpoints:
/// four beams, a length penalty of 2.0 and early stopping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamSearch {
    /// Hypotheses kept alive at every step.
    pub num_beams: usize,
    /// Exponent applied to the hypothesis length when scoring finished hypotheses. Values above
    /// 1.0 favour longer output.
    pub length_penalty: f32,
    /// Stop as soon as `num_beams` hypotheses have finished.
    pub early_stopping: bool,
    /// Maximum number of generated tokens.
    pub max_length: usize,
    /// End-of-sequence is suppressed until the sequence, decoder start token included, holds
    /// this many tokens.
    pub min_length: usize,
    /// Token every sequence starts with.
    pub decoder_start_token_id: u32,
    /// End-of-sequence token.
    pub eos_token_id: u32,
}

impl Default for BeamSearch {
    fn default() -> Self {
        Self {
            num_beams: 4,
            length_penalty: 2.0,
            early_stopping: true,
            max_length: 150,
            min_length: 40,
            decoder_start_token_id: 0,
            eos_token_id: 1,
        }
    }
}

#[derive(Debug, Clone)]
struct Beam {
    tokens: Vec<u32>,
    log_prob: f32,
}

#[derive(Debug)]
struct Hypothesis {
    tokens: Vec<u32>,
    score: f32,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    beam: usize,
    token: u32,
    log_prob: f32,
}

impl BeamSearch {
    /// Returns a copy generating between `min_length` and `max_length` tokens.
    #[must_use]
    pub const fn with_lengths(mut self, max_length: usize, min_length: usize) -> Self {
        self.max_length = max_length;
        self.min_length = min_length;
        self
    }

    /// Runs the search.
    ///
    /// `step` receives the live sequences, each starting with the decoder start token and all of
    /// equal length, and returns next-token logits for each of them in the same order. The best
    /// hypothesis is returned without the start token and without the end-of-sequence token.
    ///
    /// # Errors
    /// Whatever `step` returns.
    pub fn search<E, F>(&self, mut step: F) -> Result<Vec<u32>, E>
    where
        F: FnMut(&[Vec<u32>]) -> Result<Vec<Vec<f32>>, E>,
    {
        let num_beams = self.num_beams.max(1);
        let mut beams = vec![Beam {
            tokens: vec![self.decoder_start_token_id],
            log_prob: 0.0,
        }];
        let mut finished: Vec<Hypothesis> = Vec::with_capacity(num_beams + 1);

        for generated in 0..self.max_length {
            let sequences: Vec<Vec<u32>> = beams.iter().map(|beam| beam.tokens.clone()).collect();
            let logits = step(&sequences)?;

            let mut candidates = Vec::with_capacity(beams.len() * num_beams * 2);
            for (index, (beam, logits)) in beams.iter().zip(&logits).enumerate() {
                let mut log_probs = log_softmax(logits);
                if generated + 1 < self.min_length {
                    if let Some(eos) = log_probs.get_mut(self.eos_token_id as usize) {
                        *eos = f32::NEG_INFINITY;
                    }
                }
                candidates.extend(top_tokens(&log_probs, num_beams * 2).into_iter().map(
                    |(token, log_prob)| Candidate {
                        beam: index,
                        token,
                        log_prob: beam.log_prob + log_prob,
                    },
                ));
            }
            candidates.sort_by(compare_candidates);

            let mut next = Vec::with_capacity(num_beams);
            for (rank, candidate) in candidates.iter().enumerate() {
                if candidate.token == self.eos_token_id {
                    if rank < num_beams {
                        let tokens = beams[candidate.beam].tokens[1..].to_vec();
                        self.keep(&mut finished, tokens, candidate.log_prob, generated + 1);
                    }
                } else {
                    let mut tokens = beams[candidate.beam].tokens.clone();
                    tokens.push(candidate.token);
                    next.push(Beam {
                        tokens,
                        log_prob: candidate.log_prob,
                    });
                }
                if next.len() == num_beams {
                    break;
                }
            }

            beams = next;
            if beams.is_empty() || self.is_done(&finished, &beams, generated + 1, num_beams) {
                break;
            }
        }

        if finished.len() < num_beams {
            for beam in &beams {
                let length = beam.tokens.len() - 1;
                self.keep(&mut finished, beam.tokens[1..].to_vec(), beam.log_prob, length);
            }
        }

        Ok(finished
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|best| best.tokens)
            .unwrap_or_default())
    }

    #[allow(clippy::cast_precision_loss)]
    fn normalized(&self, log_prob: f32, length: usize) -> f32 {
        log_prob / (length.max(1) as f32).powf(self.length_penalty)
    }

    /// Adds a finished hypothesis, keeping only the best `num_beams`.
    fn keep(&self, finished: &mut Vec<Hypothesis>, tokens: Vec<u32>, log_prob: f32, length: usize) {
        finished.push(Hypothesis {
            tokens,
            score: self.normalized(log_prob, length),
        });
        finished.sort_by(|a, b| b.score.total_cmp(&a.score));
        finished.truncate(self.num_beams.max(1));
    }

    fn is_done(&self, finished: &[Hypothesis], beams: &[Beam], length: usize, num_beams: usize) -> bool {
        if finished.len() < num_beams {
            return false;
        }
        if self.early_stopping {
            return true;
        }
        let worst = finished.last().map_or(f32::NEG_INFINITY, |h| h.score);
        let best_live = beams
            .iter()
            .map(|beam| self.normalized(beam.log_prob, length))
            .fold(f32::NEG_INFINITY, f32::max);
        best_live <= worst
    }
}

/// Highest score first; ties go to the earlier beam, then the lower token id.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.log_prob
        .total_cmp(&a.log_prob)
        .then(a.beam.cmp(&b.beam))
        .then(a.token.cmp(&b.token))
}

fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![f32::NEG_INFINITY; logits.len()];
    }
    let log_sum = logits.iter().map(|&x| (x - max).exp()).sum::<f32>().ln() + max;
    logits.iter().map(|&x| x - log_sum).collect()
}

/// The `n` most likely finite tokens, best first.
fn top_tokens(log_probs: &[f32], n: usize) -> Vec<(u32, f32)> {
    let mut ranked: Vec<(u32, f32)> = log_probs
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_finite())
        .filter_map(|(token, &p)| u32::try_from(token).ok().map(|token| (token, p)))
        .collect();
    let by_score = |a: &(u32, f32), b: &(u32, f32)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));
    if ranked.len() > n && n > 0 {
        ranked.select_nth_unstable_by(n - 1, by_score);
        ranked.truncate(n);
    }
    ranked.sort_unstable_by(by_score);
    ranked
}
