//! Configuration for the translation engine
//!
//! Values come from an optional TOML file and are then overridden by
//! environment variables, so a deployment can swap model identifiers
//! without editing the file.

use crate::error::{Result, TranslateError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub hub: HubConfig,
}

/// Model identifiers for every translation direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// English -> French (required)
    #[serde(default = "default_forward")]
    pub forward: SlotSpec,

    /// French -> English (required)
    #[serde(default = "default_reverse")]
    pub reverse: SlotSpec,

    /// Tamil -> French, used directly when it loads
    #[serde(default = "default_low_resource_direct")]
    pub low_resource_direct: Option<SlotSpec>,

    /// Tamil -> English, composed with the forward model as a fallback
    #[serde(default = "default_low_resource_intermediate")]
    pub low_resource_intermediate: Option<SlotSpec>,
}

/// Where to find one model and its tokenizer(s)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub model_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Repo holding the tokenizer files when the model repo has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_repo: Option<String>,

    /// Tokenizer used to encode source text (repo file or local path)
    #[serde(default = "default_tokenizer_file")]
    pub source_tokenizer: String,

    /// Tokenizer used to decode output; defaults to the source tokenizer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tokenizer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,

    #[serde(default = "default_num_beams")]
    pub num_beams: usize,

    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Skip accelerator probing
    #[serde(default)]
    pub force_cpu: bool,

    #[serde(default)]
    pub ordinal: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

// Defaults

// Helsinki-NLP checkpoints ship SentencePiece files only; the converted
// tokenizer JSON and safetensors revisions are the ones candle's marian
// example uses.
const CONVERTED_TOKENIZERS_EN_FR: &str = "KeighBee/candle-marian";
const CONVERTED_TOKENIZERS_FR_EN: &str = "lmz/candle-marian";

fn default_forward() -> SlotSpec {
    SlotSpec::new("Helsinki-NLP/opus-mt-en-fr")
        .with_revision("refs/pr/9")
        .with_tokenizers(
            CONVERTED_TOKENIZERS_EN_FR,
            "tokenizer-marian-base-en-fr-en.json",
            Some("tokenizer-marian-base-en-fr-fr.json".to_string()),
        )
}

fn default_reverse() -> SlotSpec {
    SlotSpec::new("Helsinki-NLP/opus-mt-fr-en")
        .with_revision("refs/pr/4")
        .with_tokenizers(
            CONVERTED_TOKENIZERS_FR_EN,
            "tokenizer-marian-base-fr.json",
            Some("tokenizer-marian-base-en.json".to_string()),
        )
}

// No converted tokenizers are published for the Tamil checkpoints. These
// slots load once `tokenizer_repo` points at converted files, and degrade
// to placeholders until then.
fn default_low_resource_direct() -> Option<SlotSpec> {
    Some(SlotSpec::new("Helsinki-NLP/opus-mt-ta-fr"))
}

fn default_low_resource_intermediate() -> Option<SlotSpec> {
    Some(SlotSpec::new("Helsinki-NLP/opus-mt-ta-en"))
}

fn default_tokenizer_file() -> String {
    "tokenizer.json".to_string()
}

fn default_max_new_tokens() -> usize {
    128
}

fn default_num_beams() -> usize {
    4
}

fn default_max_input_tokens() -> usize {
    512
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            forward: default_forward(),
            reverse: default_reverse(),
            low_resource_direct: default_low_resource_direct(),
            low_resource_intermediate: default_low_resource_intermediate(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: default_max_new_tokens(),
            num_beams: default_num_beams(),
            max_input_tokens: default_max_input_tokens(),
        }
    }
}

impl SlotSpec {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            revision: None,
            tokenizer_repo: None,
            source_tokenizer: default_tokenizer_file(),
            target_tokenizer: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_tokenizers(
        mut self,
        repo: impl Into<String>,
        source: impl Into<String>,
        target: Option<String>,
    ) -> Self {
        self.tokenizer_repo = Some(repo.into());
        self.source_tokenizer = source.into();
        self.target_tokenizer = target;
        self
    }

    pub fn tokenizer_repo(&self) -> &str {
        self.tokenizer_repo.as_deref().unwrap_or(&self.model_id)
    }

    /// The model revision applies to tokenizers only when they share its repo
    pub fn tokenizer_revision(&self) -> Option<&str> {
        match self.tokenizer_repo {
            Some(_) => None,
            None => self.revision.as_deref(),
        }
    }

    pub fn target_tokenizer(&self) -> &str {
        self.target_tokenizer
            .as_deref()
            .unwrap_or(&self.source_tokenizer)
    }
}

impl TranslatorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TranslatorConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Default location: `<config dir>/lingo/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lingo").join("config.toml"))
    }

    /// Load `path` if given, else the default location if it exists, else
    /// defaults; environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup (the environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // An overridden model reads its own tokenizer.json at the default revision
        if let Some(id) = lookup("EN_FR_MODEL").filter(|v| !v.trim().is_empty()) {
            self.models.forward = SlotSpec::new(id.trim());
        }
        if let Some(id) = lookup("FR_EN_MODEL").filter(|v| !v.trim().is_empty()) {
            self.models.reverse = SlotSpec::new(id.trim());
        }
        // An empty value switches an optional model off
        if let Some(id) = lookup("TA_FR_MODEL") {
            self.models.low_resource_direct = optional_spec(&id);
        }
        if let Some(id) = lookup("TA_EN_MODEL") {
            self.models.low_resource_intermediate = optional_spec(&id);
        }

        if let Some(value) = lookup("LINGO_FORCE_CPU") {
            self.device.force_cpu = parse_flag(&value);
        }
        if let Some(value) = lookup("LINGO_DEVICE_ORDINAL") {
            self.device.ordinal = parse_number("LINGO_DEVICE_ORDINAL", &value)?;
        }
        if let Some(value) = lookup("LINGO_MAX_NEW_TOKENS") {
            self.generation.max_new_tokens = parse_number("LINGO_MAX_NEW_TOKENS", &value)?;
        }
        if let Some(value) = lookup("LINGO_NUM_BEAMS") {
            self.generation.num_beams = parse_number("LINGO_NUM_BEAMS", &value)?;
        }
        if let Some(value) = lookup("LINGO_MAX_INPUT_TOKENS") {
            self.generation.max_input_tokens = parse_number("LINGO_MAX_INPUT_TOKENS", &value)?;
        }

        // hf-hub reads HUGGING_FACE_HUB_TOKEN; most users export HF_TOKEN
        if let Some(token) = lookup("HF_TOKEN")
            .or_else(|| lookup("HUGGING_FACE_HUB_TOKEN"))
            .filter(|t| !t.is_empty())
        {
            self.hub.token = Some(token);
        }
        if let Some(home) = lookup("HF_HOME").filter(|h| !h.is_empty()) {
            self.hub.cache_dir = Some(PathBuf::from(home).join("hub"));
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.forward.model_id.trim().is_empty() {
            return Err(TranslateError::Config("forward model id is empty".into()));
        }
        if self.models.reverse.model_id.trim().is_empty() {
            return Err(TranslateError::Config("reverse model id is empty".into()));
        }
        if self.generation.max_new_tokens == 0 {
            return Err(TranslateError::Config("max_new_tokens must be at least 1".into()));
        }
        if self.generation.num_beams == 0 {
            return Err(TranslateError::Config("num_beams must be at least 1".into()));
        }
        if self.generation.max_input_tokens < 2 {
            return Err(TranslateError::Config("max_input_tokens must be at least 2".into()));
        }
        Ok(())
    }
}

fn optional_spec(value: &str) -> Option<SlotSpec> {
    let id = value.trim();
    (!id.is_empty()).then(|| SlotSpec::new(id))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| TranslateError::Config(format!("{} must be a number, got {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_cover_all_directions() {
        let config = TranslatorConfig::default();
        assert_eq!(config.models.forward.model_id, "Helsinki-NLP/opus-mt-en-fr");
        assert_eq!(config.models.reverse.model_id, "Helsinki-NLP/opus-mt-fr-en");
        assert!(config.models.low_resource_direct.is_some());
        assert!(config.models.low_resource_intermediate.is_some());
        assert_eq!(config.generation.max_new_tokens, 128);
        assert_eq!(config.generation.num_beams, 4);
    }

    #[test]
    fn test_default_slots_use_converted_tokenizers() {
        let models = TranslatorConfig::default().models;

        assert_eq!(models.forward.revision.as_deref(), Some("refs/pr/9"));
        assert_eq!(models.forward.tokenizer_repo(), "KeighBee/candle-marian");
        assert_eq!(models.forward.source_tokenizer, "tokenizer-marian-base-en-fr-en.json");
        assert_eq!(models.forward.target_tokenizer(), "tokenizer-marian-base-en-fr-fr.json");

        assert_eq!(models.reverse.revision.as_deref(), Some("refs/pr/4"));
        assert_eq!(models.reverse.tokenizer_repo(), "lmz/candle-marian");
        assert_eq!(models.reverse.source_tokenizer, "tokenizer-marian-base-fr.json");
        assert_eq!(models.reverse.target_tokenizer(), "tokenizer-marian-base-en.json");
    }

    #[test]
    fn test_env_overrides_model_ids() {
        let config = TranslatorConfig::default()
            .with_overrides(lookup(&[
                ("EN_FR_MODEL", "my-org/en-fr"),
                ("TA_EN_MODEL", "my-org/ta-en"),
            ]))
            .unwrap();
        assert_eq!(config.models.forward.model_id, "my-org/en-fr");
        // the replacement model brings its own tokenizer
        assert_eq!(config.models.forward.tokenizer_repo(), "my-org/en-fr");
        assert_eq!(config.models.forward.revision, None);
        assert_eq!(
            config.models.low_resource_intermediate.unwrap().model_id,
            "my-org/ta-en"
        );
        assert_eq!(config.models.reverse.model_id, "Helsinki-NLP/opus-mt-fr-en");
    }

    #[test]
    fn test_empty_env_value_disables_optional_slot() {
        let config = TranslatorConfig::default()
            .with_overrides(lookup(&[("TA_FR_MODEL", ""), ("TA_EN_MODEL", "  ")]))
            .unwrap();
        assert!(config.models.low_resource_direct.is_none());
        assert!(config.models.low_resource_intermediate.is_none());
    }

    #[test]
    fn test_empty_env_value_keeps_required_slot() {
        let config = TranslatorConfig::default()
            .with_overrides(lookup(&[("EN_FR_MODEL", "")]))
            .unwrap();
        assert_eq!(config.models.forward.model_id, "Helsinki-NLP/opus-mt-en-fr");
    }

    #[test]
    fn test_numeric_overrides() {
        let config = TranslatorConfig::default()
            .with_overrides(lookup(&[
                ("LINGO_MAX_NEW_TOKENS", "64"),
                ("LINGO_NUM_BEAMS", "2"),
                ("LINGO_FORCE_CPU", "true"),
            ]))
            .unwrap();
        assert_eq!(config.generation.max_new_tokens, 64);
        assert_eq!(config.generation.num_beams, 2);
        assert!(config.device.force_cpu);
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let err = TranslatorConfig::default()
            .with_overrides(lookup(&[("LINGO_NUM_BEAMS", "four")]))
            .unwrap_err();
        assert!(matches!(err, TranslateError::Config(_)));
    }

    #[test]
    fn test_zero_beams_rejected() {
        let err = TranslatorConfig::default()
            .with_overrides(lookup(&[("LINGO_NUM_BEAMS", "0")]))
            .unwrap_err();
        assert!(matches!(err, TranslateError::Config(_)));
    }

    #[test]
    fn test_hf_token_lookup() {
        let config = TranslatorConfig::default()
            .with_overrides(lookup(&[("HF_TOKEN", "hf_abc")]))
            .unwrap();
        assert_eq!(config.hub.token.as_deref(), Some("hf_abc"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [models.forward]
            model_id = "Helsinki-NLP/opus-mt-en-fr"
            tokenizer_repo = "my-org/marian-tokenizers"
            source_tokenizer = "en.json"
            target_tokenizer = "fr.json"

            [generation]
            max_new_tokens = 96

            [device]
            force_cpu = true
        "#;
        let config: TranslatorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.models.forward.tokenizer_repo(), "my-org/marian-tokenizers");
        assert_eq!(config.models.forward.source_tokenizer, "en.json");
        assert_eq!(config.models.forward.target_tokenizer(), "fr.json");
        assert_eq!(config.models.forward.revision, None);
        assert_eq!(
            config.models.reverse.target_tokenizer(),
            "tokenizer-marian-base-en.json"
        );
        assert_eq!(config.generation.max_new_tokens, 96);
        assert_eq!(config.generation.num_beams, 4);
        assert!(config.device.force_cpu);
    }

    #[test]
    fn test_tokenizer_repo_defaults_to_model_repo() {
        let spec = SlotSpec::new("Helsinki-NLP/opus-mt-fr-en").with_revision("refs/pr/4");
        assert_eq!(spec.tokenizer_repo(), "Helsinki-NLP/opus-mt-fr-en");
        assert_eq!(spec.tokenizer_revision(), Some("refs/pr/4"));

        let spec = spec.with_tokenizers("my-org/tokenizers", "fr.json", None);
        assert_eq!(spec.tokenizer_revision(), None);
        assert_eq!(spec.target_tokenizer(), "fr.json");
    }
}
