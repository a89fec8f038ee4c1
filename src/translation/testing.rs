// Stub codec and models for exercising routing without real checkpoints

use super::batch::unpad;
use super::routing::SlotSet;
use super::slot::{ModelSlot, Slot};
use super::types::GenerationParams;
use super::{Seq2SeqModel, TextCodec};
use crate::error::{Result, TranslateError};
use candle_core::Tensor;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const EOS: u32 = 0;
pub const PAD: u32 = 1;

/// One id per character; EOS and PAD are control characters no test uses
pub struct CharCodec;

impl TextCodec for CharCodec {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<u32>>> {
        Ok(texts
            .iter()
            .map(|text| text.chars().map(u32::from).chain([EOS]).collect())
            .collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        Ok(ids
            .iter()
            .filter(|&&id| id != EOS && id != PAD)
            .filter_map(|&id| char::from_u32(id))
            .collect())
    }

    fn pad_id(&self) -> u32 {
        PAD
    }
}

/// Echoes its input behind a `[tag] ` marker, or `[tag#i] ` for n-best.
///
/// Shared counters survive the model being boxed into a slot.
#[derive(Clone)]
pub struct TaggedModel {
    tag: String,
    calls: Arc<AtomicUsize>,
    inputs: Arc<Mutex<Vec<Vec<String>>>>,
}

impl TaggedModel {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Decoded input batch of every call, in call order
    pub fn inputs(&self) -> Vec<Vec<String>> {
        self.inputs.lock().clone()
    }
}

impl Seq2SeqModel for TaggedModel {
    fn generate(
        &self,
        input_ids: &Tensor,
        params: &GenerationParams,
    ) -> Result<Vec<Vec<Vec<u32>>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rows = input_ids.to_vec2::<u32>()?;

        let mut batch = Vec::with_capacity(rows.len());
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let text = CharCodec.decode(unpad(row, PAD))?;
            let group = (0..params.num_return_sequences)
                .map(|i| {
                    let marker = if params.num_return_sequences > 1 {
                        format!("[{}#{}] ", self.tag, i)
                    } else {
                        format!("[{}] ", self.tag)
                    };
                    let mut ids = vec![PAD];
                    ids.extend(marker.chars().chain(text.chars()).map(u32::from));
                    ids.push(EOS);
                    ids
                })
                .collect();
            out.push(group);
            batch.push(text);
        }
        self.inputs.lock().push(batch);
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.tag
    }
}

/// Simulates a runtime failure during generation
pub struct FailingModel;

impl Seq2SeqModel for FailingModel {
    fn generate(
        &self,
        _input_ids: &Tensor,
        _params: &GenerationParams,
    ) -> Result<Vec<Vec<Vec<u32>>>> {
        Err(TranslateError::Generation("device lost".into()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

pub fn tagged_slot(model: &TaggedModel) -> ModelSlot {
    ModelSlot::new(model.name(), Box::new(CharCodec), Box::new(model.clone()))
}

/// Handles on the stub models behind a `SlotSet`
pub struct StubModels {
    pub forward: TaggedModel,
    pub reverse: TaggedModel,
    pub direct: TaggedModel,
    pub intermediate: TaggedModel,
}

impl StubModels {
    pub fn new() -> Self {
        Self {
            forward: TaggedModel::new("en-fr"),
            reverse: TaggedModel::new("fr-en"),
            direct: TaggedModel::new("ta-fr"),
            intermediate: TaggedModel::new("ta-en"),
        }
    }

    /// Slot set with the chosen optional slots present
    pub fn slots(&self, with_direct: bool, with_intermediate: bool) -> SlotSet<ModelSlot> {
        SlotSet {
            forward: tagged_slot(&self.forward),
            reverse: tagged_slot(&self.reverse),
            low_resource_direct: if with_direct {
                Slot::Present(tagged_slot(&self.direct))
            } else {
                Slot::Absent
            },
            low_resource_intermediate: if with_intermediate {
                Slot::Present(tagged_slot(&self.intermediate))
            } else {
                Slot::Absent
            },
        }
    }
}
