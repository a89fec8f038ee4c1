// Tokenizer codec backed by HuggingFace `tokenizers`

use super::TextCodec;
use crate::error::{Result, TranslateError};
use std::path::Path;
use tokenizers::Tokenizer;

/// Source/target tokenizer pair for one Marian direction.
///
/// Marian checkpoints use separate vocabularies for encoding and decoding
/// in some conversions, so both sides are kept even when they are the same
/// file.
pub struct HfCodec {
    source: Tokenizer,
    target: Tokenizer,
    eos_id: u32,
    pad_id: u32,
    max_input_tokens: usize,
}

impl HfCodec {
    pub fn from_files(
        source: &Path,
        target: &Path,
        eos_id: u32,
        pad_id: u32,
        max_input_tokens: usize,
    ) -> Result<Self> {
        let source = Tokenizer::from_file(source)
            .map_err(|e| TranslateError::Tokenization(format!("{}: {}", source.display(), e)))?;
        let target = Tokenizer::from_file(target)
            .map_err(|e| TranslateError::Tokenization(format!("{}: {}", target.display(), e)))?;
        Ok(Self::new(source, target, eos_id, pad_id, max_input_tokens))
    }

    pub fn new(
        source: Tokenizer,
        target: Tokenizer,
        eos_id: u32,
        pad_id: u32,
        max_input_tokens: usize,
    ) -> Self {
        Self {
            source,
            target,
            eos_id,
            pad_id,
            max_input_tokens: max_input_tokens.max(2),
        }
    }
}

impl TextCodec for HfCodec {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<u32>>> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self.source.encode_batch(inputs, true)?;
        Ok(encodings
            .iter()
            .map(|encoding| terminate(encoding.get_ids(), self.eos_id, self.max_input_tokens))
            .collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        let text = self.target.decode(ids, true)?;
        Ok(text.trim().to_string())
    }

    fn pad_id(&self) -> u32 {
        self.pad_id
    }
}

/// Truncate to `max_len` tokens and make sure the row ends with EOS.
pub(crate) fn terminate(ids: &[u32], eos_id: u32, max_len: usize) -> Vec<u32> {
    let mut ids: Vec<u32> = ids.iter().copied().filter(|&id| id != eos_id).collect();
    ids.truncate(max_len.saturating_sub(1));
    ids.push(eos_id);
    ids
}
