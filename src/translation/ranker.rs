// Candidate ranker - n-best translations per input

use super::batch::{generate_grouped, run_batch};
use super::routing::{SlotSet, TranslationPath};
use super::slot::ModelSlot;
use super::types::{CandidateSet, GenerationParams, LanguageCode, RankOptions, filter_nonempty};
use crate::error::Result;
use candle_core::Device;

/// n-best candidates for each non-empty text.
///
/// A composed path translates the whole batch through the first hop
/// (single best) and only asks the final hop for n-best output.
pub fn rank_candidates<S: AsRef<str>>(
    slots: &SlotSet<ModelSlot>,
    device: &Device,
    texts: &[S],
    source: &LanguageCode,
    options: &RankOptions,
    single_best: &GenerationParams,
) -> Result<Vec<CandidateSet>> {
    let texts = filter_nonempty(texts);
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let params = options.to_params()?;

    match slots.resolve_path(source) {
        Ok(TranslationPath::Direct(slot)) => rank_on_slot(slot, device, &texts, &texts, &params),
        Ok(TranslationPath::Composed { first, second }) => {
            tracing::debug!("Ranking through {} then {}", first.name(), second.name());
            let intermediate =
                run_batch(first.codec(), first.model(), device, &texts, single_best)?;
            rank_on_slot(second, device, &texts, &intermediate, &params)
        }
        Err(no_path) => {
            tracing::warn!("{}; returning placeholders for {} text(s)", no_path, texts.len());
            Ok(texts
                .iter()
                .map(|text| CandidateSet::new(text.as_str(), vec![no_path.placeholder(text)]))
                .collect())
        }
    }
}

/// One generation call per input, since each carries its own beam set
fn rank_on_slot(
    slot: &ModelSlot,
    device: &Device,
    sources: &[String],
    inputs: &[String],
    params: &GenerationParams,
) -> Result<Vec<CandidateSet>> {
    sources
        .iter()
        .zip(inputs)
        .enumerate()
        .map(|(index, (source, input))| {
            let params = GenerationParams {
                seed: params.seed.wrapping_add(index as u64),
                ..params.clone()
            };
            let candidates = generate_grouped(
                slot.codec(),
                slot.model(),
                device,
                std::slice::from_ref(input),
                &params,
            )?
            .into_iter()
            .next()
            .unwrap_or_default();
            Ok(CandidateSet::new(source.as_str(), candidates))
        })
        .collect()
}
