//! Decoding strategies for sequence-to-sequence generation
//!
//! Both strategies are written against [`StepScorer`], which hides the model:
//! given a batch of equal-length decoder prefixes it returns next-token
//! log-probabilities for each one. Returned sequences start with the decoder
//! start token and end with EOS unless the token budget ran out.

use super::types::GenerationParams;
use crate::error::{Result, TranslateError};
use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

/// Ids the decoder needs to know about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub decoder_start: u32,
    pub eos: u32,
    /// Never generated
    pub pad: u32,
}

/// Next-token log-probabilities for a batch of decoder prefixes
pub trait StepScorer {
    fn next_log_probs(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    sum_log_prob: f32,
}

/// Bounded set of completed hypotheses, best by length-normalized score
struct FinishedHypotheses {
    capacity: usize,
    length_penalty: f32,
    entries: Vec<(f32, Vec<u32>)>,
}

impl FinishedHypotheses {
    fn new(capacity: usize, length_penalty: f32) -> Self {
        Self {
            capacity,
            length_penalty,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    fn normalize(&self, sum_log_prob: f32, generated_len: usize) -> f32 {
        sum_log_prob / (generated_len.max(1) as f32).powf(self.length_penalty)
    }

    fn worst_score(&self) -> f32 {
        self.entries
            .iter()
            .map(|(score, _)| *score)
            .fold(f32::INFINITY, f32::min)
    }

    fn add(&mut self, tokens: Vec<u32>, sum_log_prob: f32) {
        // tokens[0] is the decoder start token
        let score = self.normalize(sum_log_prob, tokens.len().saturating_sub(1));
        if self.entries.len() < self.capacity || score > self.worst_score() {
            self.entries.push((score, tokens));
            if self.entries.len() > self.capacity {
                if let Some(worst) = self
                    .entries
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.0.total_cmp(&b.1.0))
                    .map(|(i, _)| i)
                {
                    self.entries.swap_remove(worst);
                }
            }
        }
    }

    fn is_done(&self, best_live_sum: f32, generated_len: usize, early_stopping: bool) -> bool {
        if self.entries.len() < self.capacity {
            return false;
        }
        if early_stopping {
            return true;
        }
        self.worst_score() >= self.normalize(best_live_sum, generated_len)
    }

    fn into_ranked(mut self) -> Vec<Vec<u32>> {
        self.entries.sort_by(|a, b| b.0.total_cmp(&a.0));
        self.entries.into_iter().map(|(_, tokens)| tokens).collect()
    }
}

/// Indices of the `k` highest entries of `row`, skipping `banned`
fn top_k(row: &[f32], k: usize, banned: u32) -> Vec<(u32, f32)> {
    let mut ids: Vec<u32> = (0..row.len() as u32)
        .filter(|&id| id != banned && !row[id as usize].is_nan())
        .collect();
    let by_score_desc = |a: &u32, b: &u32| row[*b as usize].total_cmp(&row[*a as usize]);
    if k < ids.len() {
        ids.select_nth_unstable_by(k, by_score_desc);
        ids.truncate(k);
    }
    ids.sort_by(by_score_desc);
    ids.into_iter().map(|id| (id, row[id as usize])).collect()
}

/// Beam search returning the best `num_return_sequences` sequences
pub fn beam_search(
    scorer: &mut dyn StepScorer,
    special: SpecialTokens,
    params: &GenerationParams,
) -> Result<Vec<Vec<u32>>> {
    let num_beams = params.num_beams.max(1);
    let expand = 2 * num_beams;

    let mut beams = vec![Hypothesis {
        tokens: vec![special.decoder_start],
        sum_log_prob: 0.0,
    }];
    let mut finished = FinishedHypotheses::new(num_beams, params.length_penalty);
    let mut done = false;

    for step in 0..params.max_new_tokens {
        let prefixes: Vec<Vec<u32>> = beams.iter().map(|h| h.tokens.clone()).collect();
        let rows = scorer.next_log_probs(&prefixes)?;
        if rows.len() != beams.len() {
            return Err(TranslateError::Generation(format!(
                "scorer returned {} rows for {} beams",
                rows.len(),
                beams.len()
            )));
        }

        let mut candidates: Vec<(f32, usize, u32)> = Vec::with_capacity(beams.len() * expand);
        for (beam_idx, row) in rows.iter().enumerate() {
            for (token, log_prob) in top_k(row, expand, special.pad) {
                candidates.push((beams[beam_idx].sum_log_prob + log_prob, beam_idx, token));
            }
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
        candidates.truncate(expand);

        let mut next = Vec::with_capacity(num_beams);
        for (rank, (score, beam_idx, token)) in candidates.into_iter().enumerate() {
            let mut tokens = beams[beam_idx].tokens.clone();
            tokens.push(token);
            if token == special.eos {
                // EOS outside the top num_beams does not complete a hypothesis
                if rank < num_beams {
                    finished.add(tokens, score);
                }
            } else {
                next.push(Hypothesis {
                    tokens,
                    sum_log_prob: score,
                });
            }
            if next.len() == num_beams {
                break;
            }
        }

        beams = next;
        let Some(best) = beams.first() else {
            done = true;
            break;
        };
        if finished.is_done(best.sum_log_prob, step + 1, params.early_stopping) {
            done = true;
            break;
        }
    }

    if !done {
        for hypothesis in beams {
            finished.add(hypothesis.tokens, hypothesis.sum_log_prob);
        }
    }

    let mut ranked = finished.into_ranked();
    ranked.truncate(params.num_return_sequences.max(1));
    Ok(ranked)
}

/// Independent ancestral samples at `params.temperature`
pub fn sample(
    scorer: &mut dyn StepScorer,
    special: SpecialTokens,
    params: &GenerationParams,
) -> Result<Vec<Vec<u32>>> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    (0..params.num_return_sequences.max(1))
        .map(|_| sample_one(scorer, special, params, &mut rng))
        .collect()
}

fn sample_one(
    scorer: &mut dyn StepScorer,
    special: SpecialTokens,
    params: &GenerationParams,
    rng: &mut StdRng,
) -> Result<Vec<u32>> {
    let temperature = params.temperature as f32;
    let mut tokens = vec![special.decoder_start];

    for _ in 0..params.max_new_tokens {
        let row = scorer
            .next_log_probs(std::slice::from_ref(&tokens))?
            .into_iter()
            .next()
            .ok_or_else(|| TranslateError::Generation("scorer returned no rows".into()))?;

        let max = row
            .iter()
            .enumerate()
            .filter(|(id, _)| *id as u32 != special.pad)
            .map(|(_, lp)| lp / temperature)
            .fold(f32::NEG_INFINITY, f32::max);
        let weights: Vec<f32> = row
            .iter()
            .enumerate()
            .map(|(id, lp)| {
                if id as u32 == special.pad {
                    0.0
                } else {
                    (lp / temperature - max).exp()
                }
            })
            .collect();
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| TranslateError::Generation(format!("cannot sample next token: {}", e)))?;

        let token = dist.sample(rng) as u32;
        tokens.push(token);
        if token == special.eos {
            break;
        }
    }

    Ok(tokens)
}
