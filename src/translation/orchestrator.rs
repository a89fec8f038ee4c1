// Orchestrator - owns the device and every slot, routes requests to them

use super::batch::run_batch;
use super::device::{DeviceHandle, DeviceKind, select_device};
use super::hub::HubClient;
use super::ranker;
use super::routing::{NoPathAvailable, SlotSet, TranslationPath};
use super::slot::{ModelSlot, Slot, load_optional_slot, load_slot};
use super::types::{
    CandidateSet, GenerationParams, Language, LanguageCode, RankOptions, TranslationRequest,
    TranslationResponse, filter_nonempty,
};
use crate::config::TranslatorConfig;
use crate::error::Result;
use serde::Serialize;

/// The translation engine: immutable after construction, shareable across threads
#[derive(Debug)]
pub struct TranslationOrchestrator {
    device: DeviceHandle,
    slots: SlotSet<ModelSlot>,
    params: GenerationParams,
}

/// Which directions loaded and how each language is served
#[derive(Debug, Clone, Serialize)]
pub struct Coverage {
    pub device: DeviceKind,
    pub forward: String,
    pub reverse: String,
    pub low_resource_direct: Option<String>,
    pub low_resource_intermediate: Option<String>,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub source: Language,
    /// Slot names in execution order; empty when only placeholders are produced
    pub hops: Vec<String>,
}

impl TranslationOrchestrator {
    /// Select the device, then load required slots (fatal) and optional ones (degrading)
    pub fn load(config: &TranslatorConfig) -> Result<Self> {
        config.validate()?;
        let device = select_device(&config.device);
        let hub = HubClient::new(&config.hub)?;
        let max_input = config.generation.max_input_tokens;
        let models = &config.models;

        let forward = load_slot(&models.forward, &device, &hub, max_input)?;
        let reverse = load_slot(&models.reverse, &device, &hub, max_input)?;
        let low_resource_direct =
            load_optional_slot(models.low_resource_direct.as_ref(), &device, &hub, max_input);
        let low_resource_intermediate = load_optional_slot(
            models.low_resource_intermediate.as_ref(),
            &device,
            &hub,
            max_input,
        );

        let slots = SlotSet {
            forward,
            reverse,
            low_resource_direct,
            low_resource_intermediate,
        };
        let params = GenerationParams::single_best(
            config.generation.max_new_tokens,
            config.generation.num_beams,
        );
        let orchestrator = Self::from_slots(device, slots).with_generation(params);

        let coverage = orchestrator.coverage();
        if coverage.low_resource_direct.is_none() && coverage.low_resource_intermediate.is_none() {
            tracing::warn!("No Tamil model loaded; Tamil input will get placeholder output");
        }
        tracing::info!("Translation engine ready on {:?}", coverage.device);
        Ok(orchestrator)
    }

    /// Build from already loaded slots
    pub fn from_slots(device: DeviceHandle, slots: SlotSet<ModelSlot>) -> Self {
        Self {
            device,
            slots,
            params: GenerationParams::default(),
        }
    }

    pub fn with_generation(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    pub fn slots(&self) -> &SlotSet<ModelSlot> {
        &self.slots
    }

    pub fn resolve_path(
        &self,
        source: &LanguageCode,
    ) -> std::result::Result<TranslationPath<'_, ModelSlot>, NoPathAvailable> {
        self.slots.resolve_path(source)
    }

    /// Translate every non-empty text; output aligns with the filtered input
    pub fn translate_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        source: &LanguageCode,
    ) -> Result<Vec<String>> {
        let texts = filter_nonempty(texts);
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match self.resolve_path(source) {
            Ok(path) => {
                tracing::debug!(
                    "Translating {} text(s) from {} over {} hop(s)",
                    texts.len(),
                    source,
                    path.len()
                );
                let mut current = texts;
                for slot in path.hops() {
                    current = run_batch(
                        slot.codec(),
                        slot.model(),
                        self.device.device(),
                        &current,
                        &self.params,
                    )?;
                }
                Ok(current)
            }
            Err(no_path) => {
                tracing::warn!("{}; returning placeholders for {} text(s)", no_path, texts.len());
                Ok(texts.iter().map(|t| no_path.placeholder(t)).collect())
            }
        }
    }

    /// Single-text form; `None` when the text is empty or whitespace
    pub fn translate(&self, text: &str, source: &LanguageCode) -> Result<Option<String>> {
        Ok(self.translate_batch(&[text], source)?.into_iter().next())
    }

    pub fn translate_request(&self, request: &TranslationRequest) -> Result<TranslationResponse> {
        let original = filter_nonempty(&request.texts);
        let translations = self.translate_batch(&original, &request.source_language)?;
        Ok(TranslationResponse {
            original,
            translations,
            source_language: request.source_language.clone(),
        })
    }

    pub fn rank_candidates<S: AsRef<str>>(
        &self,
        texts: &[S],
        source: &LanguageCode,
        options: &RankOptions,
    ) -> Result<Vec<CandidateSet>> {
        ranker::rank_candidates(
            &self.slots,
            self.device.device(),
            texts,
            source,
            options,
            &self.params,
        )
    }

    pub fn coverage(&self) -> Coverage {
        let name = |slot: &Slot| match slot {
            Slot::Present(slot) => Some(slot.name().to_string()),
            Slot::Absent => None,
        };
        let routes = Language::ALL
            .into_iter()
            .map(|source| Route {
                source,
                hops: self
                    .resolve_path(&source.into())
                    .map(|path| path.hops().iter().map(|s| s.name().to_string()).collect())
                    .unwrap_or_default(),
            })
            .collect();

        Coverage {
            device: self.device.kind(),
            forward: self.slots.forward.name().to_string(),
            reverse: self.slots.reverse.name().to_string(),
            low_resource_direct: name(&self.slots.low_resource_direct),
            low_resource_intermediate: name(&self.slots.low_resource_intermediate),
            routes,
        }
    }
}
