// Marian MT implementation using Candle

use super::Seq2SeqModel;
use super::batch::unpad;
use super::device::DeviceHandle;
use super::generation::{self, SpecialTokens, StepScorer};
use super::hub::HubClient;
use super::types::GenerationParams;
use crate::config::SlotSpec;
use crate::error::{Result, TranslateError};
use candle_core::{D, DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::marian::{self, MTModel};
use parking_lot::Mutex;

/// Weight files tried in order
const WEIGHT_FILES: [&str; 2] = ["model.safetensors", "pytorch_model.bin"];

/// Candle's Marian decoder builds its causal mask in F32, so weights stay F32
/// on every device.
pub const WEIGHT_DTYPE: DType = DType::F32;

/// A Marian encoder-decoder on one device.
///
/// Candle's decoder keeps its KV cache inside the model, so generation needs
/// exclusive access and calls on one slot are serialized by the mutex.
pub struct MarianModel {
    name: String,
    config: marian::Config,
    device: Device,
    model: Mutex<MTModel>,
}

impl MarianModel {
    pub fn load(spec: &SlotSpec, device: &DeviceHandle, hub: &HubClient) -> Result<Self> {
        let revision = spec.revision.as_deref();

        let config_path = hub.fetch(&spec.model_id, revision, "config.json")?;
        let config: marian::Config = serde_json::from_str(&std::fs::read_to_string(config_path)?)?;
        tracing::debug!(
            "{}: {} encoder / {} decoder layers, d_model {}",
            spec.model_id,
            config.encoder_layers,
            config.decoder_layers,
            config.d_model
        );

        let weights = hub.fetch_any(&spec.model_id, revision, &WEIGHT_FILES)?;
        let is_safetensors = weights
            .extension()
            .is_some_and(|ext| ext == "safetensors");
        let vb = if is_safetensors {
            // SAFETY: the file is a read-only hub cache entry, not modified while mapped
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights], WEIGHT_DTYPE, device.device())?
            }
        } else {
            tracing::warn!(
                "{} has no safetensors weights, reading the PyTorch checkpoint",
                spec.model_id
            );
            VarBuilder::from_pth(&weights, WEIGHT_DTYPE, device.device())?
        };

        let model = MTModel::new(&config, vb)?;
        Ok(Self::new(&spec.model_id, config, model, device.device()))
    }

    pub fn new(name: &str, config: marian::Config, model: MTModel, device: &Device) -> Self {
        Self {
            name: name.to_string(),
            config,
            device: device.clone(),
            model: Mutex::new(model),
        }
    }

    pub fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens {
            decoder_start: self.config.decoder_start_token_id,
            eos: self.config.eos_token_id,
            pad: self.config.pad_token_id,
        }
    }
}

impl Seq2SeqModel for MarianModel {
    fn generate(
        &self,
        input_ids: &Tensor,
        params: &GenerationParams,
    ) -> Result<Vec<Vec<Vec<u32>>>> {
        params.validate()?;
        let special = self.special_tokens();
        let rows = input_ids.to_device(&Device::Cpu)?.to_vec2::<u32>()?;

        let mut model = self.model.lock();
        let mut groups = Vec::with_capacity(rows.len());

        // No encoder attention mask in candle's Marian, so each row is
        // encoded without its padding.
        for row in &rows {
            let ids = unpad(row, special.pad);
            // encoder self-attention also caches keys/values
            model.reset_kv_cache();
            let tokens = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
            let encoder_xs = model.encoder().forward(&tokens, 0)?;

            let mut scorer = MarianScorer {
                model: &mut *model,
                encoder_xs: &encoder_xs,
                device: &self.device,
                cached: None,
            };
            let sequences = if params.do_sample {
                generation::sample(&mut scorer, special, params)?
            } else {
                generation::beam_search(&mut scorer, special, params)?
            };
            groups.push(sequences);
        }
        model.reset_kv_cache();

        Ok(groups)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Feeds decoder prefixes through the model for `generation`
struct MarianScorer<'a> {
    model: &'a mut MTModel,
    encoder_xs: &'a Tensor,
    device: &'a Device,
    /// Prefix whose keys/values are in the KV cache
    cached: Option<Vec<u32>>,
}

impl MarianScorer<'_> {
    /// A single prefix extending the cached one by one token can reuse the cache
    fn can_extend(&self, prefixes: &[Vec<u32>]) -> Option<usize> {
        match (&self.cached, prefixes) {
            (Some(prev), [prefix])
                if prefix.len() == prev.len() + 1 && prefix.starts_with(prev) =>
            {
                Some(prev.len())
            }
            _ => None,
        }
    }
}

impl StepScorer for MarianScorer<'_> {
    fn next_log_probs(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
        let batch = prefixes.len();
        let len = prefixes.first().map_or(0, Vec::len);
        if batch == 0 || len == 0 || prefixes.iter().any(|p| p.len() != len) {
            return Err(TranslateError::Generation(
                "decoder prefixes must be non-empty and of equal length".into(),
            ));
        }

        let logits = match self.can_extend(prefixes) {
            Some(past) => {
                let input = Tensor::new(&prefixes[0][past..], self.device)?.unsqueeze(0)?;
                self.model.decode(&input, self.encoder_xs, past)?
            }
            None => {
                self.model.reset_kv_cache();
                let input = Tensor::from_vec(prefixes.concat(), (batch, len), self.device)?;
                let encoder_xs = if batch == 1 {
                    self.encoder_xs.clone()
                } else {
                    self.encoder_xs.repeat((batch, 1, 1))?
                };
                self.model.decode(&input, &encoder_xs, 0)?
            }
        };
        self.cached = (batch == 1).then(|| prefixes[0].clone());

        let steps = logits.dim(1)?;
        let last = logits.i((.., steps - 1, ..))?.to_dtype(DType::F32)?;
        let log_probs = candle_nn::ops::log_softmax(&last, D::Minus1)?;
        Ok(log_probs.to_vec2::<f32>()?)
    }
}
