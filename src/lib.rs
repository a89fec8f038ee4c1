// lingo - translation routing engine for a language-learning API
// Routes text to pretrained Marian models via Candle, composing two models
// when no direct one exists for a language

pub mod config;
pub mod error;
pub mod translation;

pub use config::{SlotSpec, TranslatorConfig};
pub use error::{Result, TranslateError};
pub use translation::{
    BlockingTranslationService, CandidateSet, Coverage, Language, LanguageCode, RankOptions,
    TranslationOrchestrator, TranslationRequest, TranslationResponse, TranslationService,
};
