// Core types for the translation engine

use crate::error::{Result, TranslateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the routing table knows about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    French,
    Tamil,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::English, Language::French, Language::Tamil];

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
            Language::Tamil => "ta",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::French => "French",
            Language::Tamil => "Tamil",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Caller-supplied source language, e.g. "en", "FR", "ta-IN"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two leading characters, which are all routing looks at
    pub fn prefix(&self) -> String {
        self.0.chars().take(2).collect()
    }

    /// Known routing tag, or `None` for codes that take the default route
    pub fn language(&self) -> Option<Language> {
        let prefix = self.prefix();
        Language::ALL.into_iter().find(|lang| lang.code() == prefix)
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Language::English.into()
    }
}

impl From<Language> for LanguageCode {
    fn from(lang: Language) -> Self {
        Self(lang.code().to_string())
    }
}

impl From<&str> for LanguageCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for LanguageCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drop empty and whitespace-only entries, keeping order
pub fn filter_nonempty<S: AsRef<str>>(texts: &[S]) -> Vec<String> {
    texts
        .iter()
        .map(AsRef::as_ref)
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// A batch translation request as received from the service layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub texts: Vec<String>,
    #[serde(default)]
    pub source_language: LanguageCode,
}

impl TranslationRequest {
    pub fn new(texts: Vec<String>, source_language: impl Into<LanguageCode>) -> Self {
        Self {
            texts,
            source_language: source_language.into(),
        }
    }

    pub fn single(text: impl Into<String>, source_language: impl Into<LanguageCode>) -> Self {
        Self::new(vec![text.into()], source_language)
    }
}

/// Translations aligned with the filtered input texts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub original: Vec<String>,
    pub translations: Vec<String>,
    pub source_language: LanguageCode,
}

/// Ranked decoder outputs for one input text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSet {
    pub source: String,
    pub candidates: Vec<String>,
}

impl CandidateSet {
    pub fn new(source: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            source: source.into(),
            candidates,
        }
    }

    /// Highest ranked candidate
    pub fn best(&self) -> Option<&str> {
        self.candidates.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Knobs for one `Seq2SeqModel::generate` call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    pub num_beams: usize,
    pub num_return_sequences: usize,
    pub do_sample: bool,
    pub temperature: f64,
    pub early_stopping: bool,
    pub length_penalty: f32,
    pub seed: u64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 128,
            num_beams: 4,
            num_return_sequences: 1,
            do_sample: false,
            temperature: 1.0,
            early_stopping: true,
            length_penalty: 1.0,
            seed: 0,
        }
    }
}

impl GenerationParams {
    /// Single-best beam search used for plain translation
    pub fn single_best(max_new_tokens: usize, num_beams: usize) -> Self {
        Self {
            max_new_tokens,
            num_beams,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_new_tokens == 0 {
            return Err(TranslateError::InvalidOptions(
                "max_new_tokens must be at least 1".into(),
            ));
        }
        if self.num_beams == 0 {
            return Err(TranslateError::InvalidOptions("num_beams must be at least 1".into()));
        }
        if self.num_return_sequences == 0 {
            return Err(TranslateError::InvalidOptions(
                "at least one candidate must be requested".into(),
            ));
        }
        if self.do_sample {
            if !(self.temperature > 0.0) {
                return Err(TranslateError::InvalidOptions(format!(
                    "temperature must be positive when sampling, got {}",
                    self.temperature
                )));
            }
        } else if self.num_return_sequences > self.num_beams {
            return Err(TranslateError::InvalidOptions(format!(
                "cannot return {} candidates from {} beams",
                self.num_return_sequences, self.num_beams
            )));
        }
        Ok(())
    }
}

/// Options for n-best candidate ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankOptions {
    #[serde(default = "default_num_candidates")]
    pub num_candidates: usize,
    #[serde(default = "default_rank_beams")]
    pub num_beams: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,
    /// Sampling seed; a random one is drawn when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_num_candidates() -> usize {
    3
}

fn default_rank_beams() -> usize {
    5
}

fn default_temperature() -> f64 {
    1.0
}

fn default_max_new_tokens() -> usize {
    128
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            num_candidates: default_num_candidates(),
            num_beams: default_rank_beams(),
            temperature: default_temperature(),
            max_new_tokens: default_max_new_tokens(),
            seed: None,
        }
    }
}

impl RankOptions {
    pub fn with_candidates(mut self, num_candidates: usize, num_beams: usize) -> Self {
        self.num_candidates = num_candidates;
        self.num_beams = num_beams;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Beam search when more than one beam is asked for, sampling otherwise
    pub fn to_params(&self) -> Result<GenerationParams> {
        let params = GenerationParams {
            max_new_tokens: self.max_new_tokens,
            num_beams: self.num_beams,
            num_return_sequences: self.num_candidates,
            do_sample: self.num_beams <= 1,
            temperature: self.temperature,
            early_stopping: true,
            length_penalty: 1.0,
            seed: self.seed.unwrap_or_else(rand::random),
        };
        params.validate()?;
        Ok(params)
    }
}
