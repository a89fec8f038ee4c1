// Error types for lingo

use thiserror::Error;

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Errors that can occur while loading models or translating
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Model loading error: {0}")]
    ModelLoading(String),

    #[error("Tokenization error: {0}")]
    Tokenization(String),

    #[error("HuggingFace Hub error: {0}")]
    HfHub(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<tokenizers::Error> for TranslateError {
    fn from(err: tokenizers::Error) -> Self {
        TranslateError::Tokenization(err.to_string())
    }
}

impl From<hf_hub::api::sync::ApiError> for TranslateError {
    fn from(err: hf_hub::api::sync::ApiError) -> Self {
        TranslateError::HfHub(err.to_string())
    }
}

impl TranslateError {
    /// Wrap a load failure with the model it belongs to
    pub fn loading(model_id: &str, err: impl std::fmt::Display) -> Self {
        TranslateError::ModelLoading(format!("{}: {}", model_id, err))
    }
}
