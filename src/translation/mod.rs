// Translation routing engine

pub mod batch;
pub mod device;
pub mod generation;
pub mod hub;
pub mod marian;
pub mod orchestrator;
pub mod ranker;
pub mod routing;
pub mod service;
pub mod slot;
pub mod tokenizer;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use device::{DeviceHandle, DeviceKind, select_device};
pub use orchestrator::{Coverage, TranslationOrchestrator};
pub use routing::{NoPathAvailable, SlotSet, TranslationPath};
pub use service::{BlockingTranslationService, TranslationService};
pub use slot::{ModelSlot, Slot};
pub use types::{
    CandidateSet, GenerationParams, Language, LanguageCode, RankOptions, TranslationRequest,
    TranslationResponse,
};

use crate::error::Result;
use candle_core::Tensor;

/// Turns text into model input ids and generated ids back into text
pub trait TextCodec: Send + Sync {
    /// Unpadded, EOS-terminated ids for each text, in order
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<u32>>>;

    /// Detokenize, dropping special tokens
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// Id used to right-pad rows to a common length
    fn pad_id(&self) -> u32;
}

/// A pretrained encoder-decoder translation model
pub trait Seq2SeqModel: Send + Sync {
    /// Generate for a padded `(batch, seq_len)` u32 tensor of input ids.
    ///
    /// Returns one group per input row, in row order, each holding between
    /// one and `params.num_return_sequences` sequences, best first.
    fn generate(&self, input_ids: &Tensor, params: &GenerationParams)
    -> Result<Vec<Vec<Vec<u32>>>>;

    fn name(&self) -> &str;
}
