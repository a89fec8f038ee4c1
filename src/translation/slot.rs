// Model slots - one tokenizer + model pair per translation direction

use super::device::DeviceHandle;
use super::hub::HubClient;
use super::marian::MarianModel;
use super::tokenizer::HfCodec;
use super::{Seq2SeqModel, TextCodec};
use crate::config::SlotSpec;
use crate::error::{Result, TranslateError};

/// A loaded direction, immutable once built
pub struct ModelSlot {
    name: String,
    codec: Box<dyn TextCodec>,
    model: Box<dyn Seq2SeqModel>,
}

impl ModelSlot {
    pub fn new(
        name: impl Into<String>,
        codec: Box<dyn TextCodec>,
        model: Box<dyn Seq2SeqModel>,
    ) -> Self {
        Self {
            name: name.into(),
            codec,
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec(&self) -> &dyn TextCodec {
        self.codec.as_ref()
    }

    pub fn model(&self) -> &dyn Seq2SeqModel {
        self.model.as_ref()
    }
}

impl std::fmt::Debug for ModelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSlot").field("name", &self.name).finish()
    }
}

/// An optional direction that may have failed to load
#[derive(Debug)]
pub enum Slot<T = ModelSlot> {
    Present(T),
    Absent,
}

impl<T> Slot<T> {
    pub fn as_ref(&self) -> Slot<&T> {
        match self {
            Slot::Present(slot) => Slot::Present(slot),
            Slot::Absent => Slot::Absent,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Slot::Present(_))
    }
}

/// Load a slot; callers treat failure as fatal
pub fn load_slot(
    spec: &SlotSpec,
    device: &DeviceHandle,
    hub: &HubClient,
    max_input_tokens: usize,
) -> Result<ModelSlot> {
    tracing::info!("Loading translation model {}", spec.model_id);
    let model = MarianModel::load(spec, device, hub)
        .map_err(|e| TranslateError::loading(&spec.model_id, e))?;

    let tokenizer_repo = spec.tokenizer_repo();
    let revision = spec.tokenizer_revision();
    let source = hub
        .fetch(tokenizer_repo, revision, &spec.source_tokenizer)
        .map_err(|e| TranslateError::loading(&spec.model_id, e))?;
    let target = hub
        .fetch(tokenizer_repo, revision, spec.target_tokenizer())
        .map_err(|e| TranslateError::loading(&spec.model_id, e))?;
    let tokens = model.special_tokens();
    let codec = HfCodec::from_files(&source, &target, tokens.eos, tokens.pad, max_input_tokens)
        .map_err(|e| TranslateError::loading(&spec.model_id, e))?;

    tracing::info!("Loaded {}", spec.model_id);
    Ok(ModelSlot::new(
        spec.model_id.clone(),
        Box::new(codec),
        Box::new(model),
    ))
}

/// Load an optional slot, degrading to `Absent` on any failure
pub fn load_optional_slot(
    spec: Option<&SlotSpec>,
    device: &DeviceHandle,
    hub: &HubClient,
    max_input_tokens: usize,
) -> Slot {
    let Some(spec) = spec else {
        return Slot::Absent;
    };
    match load_slot(spec, device, hub, max_input_tokens) {
        Ok(slot) => Slot::Present(slot),
        Err(e) => {
            tracing::warn!("Optional model {} unavailable: {}", spec.model_id, e);
            Slot::Absent
        }
    }
}
