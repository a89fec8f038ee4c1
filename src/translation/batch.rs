// Batch executor - one generation call per slot for a whole batch

use super::types::GenerationParams;
use super::{Seq2SeqModel, TextCodec};
use crate::error::{Result, TranslateError};
use candle_core::{Device, Tensor};

/// Translate `texts` in one generation call, single best per text
pub fn run_batch(
    codec: &dyn TextCodec,
    model: &dyn Seq2SeqModel,
    device: &Device,
    texts: &[String],
    params: &GenerationParams,
) -> Result<Vec<String>> {
    let single = GenerationParams {
        num_return_sequences: 1,
        ..params.clone()
    };
    let groups = generate_grouped(codec, model, device, texts, &single)?;
    Ok(groups
        .into_iter()
        .map(|group| group.into_iter().next().unwrap_or_default())
        .collect())
}

/// Generate `params.num_return_sequences` decoded outputs per text
pub fn generate_grouped(
    codec: &dyn TextCodec,
    model: &dyn Seq2SeqModel,
    device: &Device,
    texts: &[String],
    params: &GenerationParams,
) -> Result<Vec<Vec<String>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    params.validate()?;

    let rows = codec.encode_batch(texts)?;
    if rows.len() != texts.len() {
        return Err(TranslateError::Tokenization(format!(
            "encoded {} rows for {} texts",
            rows.len(),
            texts.len()
        )));
    }
    let input_ids = pad_batch(&rows, codec.pad_id(), device)?;
    tracing::debug!(
        "Generating with {} for batch {:?}, {} beam(s)",
        model.name(),
        input_ids.dims(),
        params.num_beams
    );

    let groups = model.generate(&input_ids, params)?;
    if groups.len() != texts.len() {
        return Err(TranslateError::Generation(format!(
            "{} returned {} groups for {} texts",
            model.name(),
            groups.len(),
            texts.len()
        )));
    }
    let per_text = params.num_return_sequences;
    if let Some(bad) = groups.iter().find(|g| g.is_empty() || g.len() > per_text) {
        return Err(TranslateError::Generation(format!(
            "{} returned {} sequences for one text, expected 1..={}",
            model.name(),
            bad.len(),
            per_text
        )));
    }

    groups
        .iter()
        .map(|group| group.iter().map(|ids| codec.decode(ids)).collect())
        .collect()
}

/// Right-pad rows to the longest one and place them on `device`
pub(crate) fn pad_batch(rows: &[Vec<u32>], pad_id: u32, device: &Device) -> Result<Tensor> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let mut flat = Vec::with_capacity(rows.len() * width);
    for row in rows {
        flat.extend_from_slice(row);
        flat.extend(std::iter::repeat_n(pad_id, width - row.len()));
    }
    Ok(Tensor::from_vec(flat, (rows.len(), width), device)?)
}

/// Row ids with trailing padding removed
pub(crate) fn unpad(row: &[u32], pad_id: u32) -> &[u32] {
    let end = row
        .iter()
        .rposition(|&id| id != pad_id)
        .map_or(0, |last| last + 1);
    &row[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::testing::{CharCodec, FailingModel, TaggedModel};

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pad_batch_shape() {
        let rows = vec![vec![5, 6, 0], vec![7, 0]];
        let tensor = pad_batch(&rows, 9, &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[2, 3]);
        assert_eq!(
            tensor.to_vec2::<u32>().unwrap(),
            vec![vec![5, 6, 0], vec![7, 0, 9]]
        );
    }

    #[test]
    fn test_unpad() {
        assert_eq!(unpad(&[5, 0, 9, 9], 9), &[5, 0]);
        assert_eq!(unpad(&[9, 9], 9), &[] as &[u32]);
    }

    #[test]
    fn test_run_batch_preserves_order() {
        let model = TaggedModel::new("fr");
        let out = run_batch(
            &CharCodec,
            &model,
            &Device::Cpu,
            &texts(&["a long sentence", "hi", "mid size"]),
            &GenerationParams::default(),
        )
        .unwrap();
        assert_eq!(out, vec!["[fr] a long sentence", "[fr] hi", "[fr] mid size"]);
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn test_empty_batch_skips_model() {
        let model = TaggedModel::new("fr");
        let out = run_batch(&CharCodec, &model, &Device::Cpu, &[], &GenerationParams::default())
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_generate_grouped_counts() {
        let model = TaggedModel::new("fr");
        let params = GenerationParams {
            num_beams: 5,
            num_return_sequences: 3,
            ..GenerationParams::default()
        };
        let groups =
            generate_grouped(&CharCodec, &model, &Device::Cpu, &texts(&["x", "y"]), &params)
                .unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.len() == 3));
        assert_eq!(groups[1][2], "[fr#2] y");
    }

    #[test]
    fn test_generation_errors_propagate() {
        let err = run_batch(
            &CharCodec,
            &FailingModel,
            &Device::Cpu,
            &texts(&["x"]),
            &GenerationParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TranslateError::Generation(_)));
    }
}
