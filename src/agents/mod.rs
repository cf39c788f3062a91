//! External collaborator interfaces
//!
//! Every stage talks to the outside world through one of these traits. The
//! concrete handles are constructed once at startup, bundled into
//! [`Collaborators`], and injected into the executor; nothing here is a
//! process-wide global.

pub mod ocr;
pub mod ollama;

use crate::core::outputs::{ExtractionOutput, ImageAnalysis, TextRefinement, Translation};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub use ocr::CommandOcrEngine;
pub use ollama::{OllamaClient, OllamaTextAgent, OllamaTranslatorAgent, OllamaVisionAgent};

/// Error types for collaborator calls.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("unreadable input: {0}")]
    Input(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("timeout after {0} seconds")]
    Timeout(u64),

    #[error("model '{0}' not available")]
    ModelUnavailable(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Primary text extraction over raw image content.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract(&self, image: &Path) -> Result<ExtractionOutput, AgentError>;
}

/// Vision-model analysis of an image.
#[async_trait]
pub trait VisionAgent: Send + Sync {
    async fn analyze(&self, image: &Path) -> Result<ImageAnalysis, AgentError>;
}

/// LLM correction of extracted text, with optional image context.
#[async_trait]
pub trait TextAgent: Send + Sync {
    async fn refine(
        &self,
        text: &str,
        context: Option<&ImageAnalysis>,
    ) -> Result<TextRefinement, AgentError>;
}

/// Translation of text into a target language.
#[async_trait]
pub trait TranslatorAgent: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str)
        -> Result<Translation, AgentError>;
}

/// The full set of collaborator handles the pipeline needs.
#[derive(Clone)]
pub struct Collaborators {
    pub ocr: Arc<dyn OcrEngine>,
    pub vision: Arc<dyn VisionAgent>,
    pub text: Arc<dyn TextAgent>,
    pub translator: Arc<dyn TranslatorAgent>,
}
