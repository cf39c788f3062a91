//! Pipeline configuration from YAML

use crate::core::step::{StepDefinition, StepKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors, surfaced before any unit is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Top-level configuration loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Which stages run
    #[serde(default)]
    pub pipeline: StageFlags,

    /// Batch orchestration settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// External OCR command settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Ollama model host settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Per-stage enable flags plus the force switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFlags {
    #[serde(default = "default_true")]
    pub enable_extraction: bool,

    #[serde(default = "default_true")]
    pub enable_analysis: bool,

    #[serde(default = "default_true")]
    pub enable_refinement: bool,

    #[serde(default)]
    pub enable_translation: bool,

    /// Re-run steps even when the state file says they completed
    #[serde(default)]
    pub force_reprocess: bool,
}

impl Default for StageFlags {
    fn default() -> Self {
        Self {
            enable_extraction: true,
            enable_analysis: true,
            enable_refinement: true,
            enable_translation: false,
            force_reprocess: false,
        }
    }
}

/// Batch orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Size of the worker pool
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Image extensions picked up when scanning a folder
    #[serde(default = "default_formats")]
    pub supported_formats: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            show_progress: true,
            supported_formats: default_formats(),
        }
    }
}

/// External OCR command invoked per image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Executable to spawn; receives the image path as its last argument
    #[serde(default = "default_ocr_command")]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_ocr_timeout")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            args: Vec::new(),
            timeout_secs: default_ocr_timeout(),
        }
    }
}

/// Ollama host and model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Falls back to the text model when unset
    #[serde(default)]
    pub translator_model: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_target_language")]
    pub target_language: String,

    #[serde(default = "default_vision_temperature")]
    pub vision_temperature: f32,

    #[serde(default = "default_text_temperature")]
    pub text_temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            vision_model: default_vision_model(),
            text_model: default_text_model(),
            translator_model: None,
            timeout_secs: default_llm_timeout(),
            target_language: default_target_language(),
            vision_temperature: default_vision_temperature(),
            text_temperature: default_text_temperature(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_workers() -> usize {
    4
}
fn default_formats() -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".bmp", ".tiff", ".webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_ocr_command() -> String {
    "ocr-extract".to_string()
}
fn default_ocr_timeout() -> u64 {
    120
}
fn default_host() -> String {
    "http://localhost:11434".to_string()
}
fn default_vision_model() -> String {
    "llava:latest".to_string()
}
fn default_text_model() -> String {
    "llama3.2:latest".to_string()
}
fn default_llm_timeout() -> u64 {
    300
}
fn default_target_language() -> String {
    "English".to_string()
}
fn default_vision_temperature() -> f32 {
    0.7
}
fn default_text_temperature() -> f32 {
    0.3
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Whether a stage is enabled. Required stages cannot be disabled, which
    /// `validate` enforces.
    pub fn enabled(&self, step: StepKind) -> bool {
        match step {
            StepKind::Extraction => self.pipeline.enable_extraction,
            StepKind::Analysis => self.pipeline.enable_analysis,
            StepKind::Refinement => self.pipeline.enable_refinement,
            StepKind::Translation => self.pipeline.enable_translation,
            StepKind::Combine => true,
        }
    }

    /// Model used by the translator agent.
    pub fn translator_model(&self) -> &str {
        self.ollama
            .translator_model
            .as_deref()
            .unwrap_or(&self.ollama.text_model)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for def in StepKind::ALL.iter().map(|k| StepDefinition::for_kind(*k)) {
            if def.required && !self.enabled(def.kind) {
                return Err(ConfigError::Invalid(format!(
                    "required step '{}' cannot be disabled",
                    def.kind
                )));
            }
        }
        if self.batch.workers == 0 {
            return Err(ConfigError::Invalid(
                "batch.workers must be at least 1".to_string(),
            ));
        }
        if self.pipeline.enable_extraction && self.ocr.command.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ocr.command must be set when extraction is enabled".to_string(),
            ));
        }
        if self.pipeline.enable_analysis && self.ollama.vision_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ollama.vision_model must be set when analysis is enabled".to_string(),
            ));
        }
        if self.pipeline.enable_refinement && self.ollama.text_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ollama.text_model must be set when refinement is enabled".to_string(),
            ));
        }
        if self.pipeline.enable_translation && self.translator_model().trim().is_empty() {
            return Err(ConfigError::Invalid(
                "a translator model must be set when translation is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a file looks like an image this pipeline handles.
    pub fn is_supported_image(&self, path: &Path) -> bool {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!(".{}", ext.to_lowercase()),
            None => return false,
        };
        self.batch
            .supported_formats
            .iter()
            .any(|f| f.to_lowercase() == ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_yaml("{}").unwrap();
        assert!(config.enabled(StepKind::Extraction));
        assert!(config.enabled(StepKind::Analysis));
        assert!(config.enabled(StepKind::Combine));
        assert!(!config.enabled(StepKind::Translation));
        assert_eq!(config.batch.workers, 4);
        assert_eq!(config.translator_model(), "llama3.2:latest");
    }

    #[test]
    fn test_rejects_zero_workers() {
        let yaml = "batch:\n  workers: 0\n";
        assert!(matches!(
            PipelineConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_disabled_required_step() {
        let yaml = "pipeline:\n  enable_extraction: false\n";
        let err = PipelineConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("extraction"));
    }

    #[test]
    fn test_rejects_missing_model_for_enabled_stage() {
        let yaml = "ollama:\n  vision_model: \"\"\n";
        assert!(PipelineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_translator_model_fallback() {
        let yaml = "ollama:\n  translator_model: aya:8b\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.translator_model(), "aya:8b");
    }

    #[test]
    fn test_supported_image() {
        let config = PipelineConfig::default();
        assert!(config.is_supported_image(&PathBuf::from("a/b.PNG")));
        assert!(config.is_supported_image(&PathBuf::from("a/b.jpeg")));
        assert!(!config.is_supported_image(&PathBuf::from("a/b.txt")));
        assert!(!config.is_supported_image(&PathBuf::from("a/noext")));
    }
}
