//! Test utilities: scripted collaborators and a preassembled pipeline rig

#![allow(dead_code)]

use async_trait::async_trait;
use captionflow::agents::{
    AgentError, Collaborators, OcrEngine, TextAgent, TranslatorAgent, VisionAgent,
};
use captionflow::core::config::PipelineConfig;
use captionflow::core::outputs::{
    ExtractionOutput, ImageAnalysis, OcrElement, TextRefinement, Translation,
};
use captionflow::pipeline::{StepExecutor, UnitRunner};
use captionflow::store::StateStore;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How many times each collaborator was invoked.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub ocr: AtomicUsize,
    pub vision: AtomicUsize,
    pub text: AtomicUsize,
    pub translator: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.ocr.load(Ordering::SeqCst)
            + self.vision.load(Ordering::SeqCst)
            + self.text.load(Ordering::SeqCst)
            + self.translator.load(Ordering::SeqCst)
    }
}

/// Scripted OCR engine returning fixed elements or a fixed error.
pub struct ScriptedOcr {
    pub elements: Vec<OcrElement>,
    pub error: Option<String>,
    pub calls: Arc<CallCounts>,
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn extract(&self, _image: &Path) -> Result<ExtractionOutput, AgentError> {
        self.calls.ocr.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(e) => Err(AgentError::Input(e.clone())),
            None => Ok(ExtractionOutput::from_elements(self.elements.clone())),
        }
    }
}

pub struct ScriptedVision {
    pub analysis: ImageAnalysis,
    pub error: Option<String>,
    pub calls: Arc<CallCounts>,
}

#[async_trait]
impl VisionAgent for ScriptedVision {
    async fn analyze(&self, _image: &Path) -> Result<ImageAnalysis, AgentError> {
        self.calls.vision.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(e) => Err(AgentError::Http(e.clone())),
            None => Ok(self.analysis.clone()),
        }
    }
}

pub struct ScriptedText {
    pub refinement: TextRefinement,
    pub timeout: bool,
    pub calls: Arc<CallCounts>,
}

#[async_trait]
impl TextAgent for ScriptedText {
    async fn refine(
        &self,
        _text: &str,
        _context: Option<&ImageAnalysis>,
    ) -> Result<TextRefinement, AgentError> {
        self.calls.text.fetch_add(1, Ordering::SeqCst);
        if self.timeout {
            return Err(AgentError::Timeout(300));
        }
        Ok(self.refinement.clone())
    }
}

pub struct ScriptedTranslator {
    pub translated: String,
    pub calls: Arc<CallCounts>,
}

#[async_trait]
impl TranslatorAgent for ScriptedTranslator {
    async fn translate(
        &self,
        _text: &str,
        target_language: &str,
    ) -> Result<Translation, AgentError> {
        self.calls.translator.fetch_add(1, Ordering::SeqCst);
        Ok(Translation {
            translated_text: self.translated.clone(),
            source_language: "Spanish".to_string(),
            target_language: target_language.to_string(),
            model: None,
        })
    }
}

/// Everything a scenario needs: a temp folder, a runner wired to scripted
/// collaborators, and the shared call counters.
pub struct Rig {
    pub dir: tempfile::TempDir,
    pub config: Arc<PipelineConfig>,
    pub store: StateStore,
    pub runner: Arc<UnitRunner>,
    pub calls: Arc<CallCounts>,
}

impl Rig {
    pub fn image(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"fake image bytes").unwrap();
        path
    }
}

/// Builder over the scripted collaborators with sensible defaults:
/// extraction finds "Hello World", refinement echoes it back, analysis sees
/// a sign, translation is disabled in config.
pub struct RigBuilder {
    config: PipelineConfig,
    ocr_elements: Vec<OcrElement>,
    ocr_fails: bool,
    analysis: ImageAnalysis,
    refinement: TextRefinement,
    refinement_times_out: bool,
    translated: String,
}

impl Default for RigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            ocr_elements: vec![
                OcrElement {
                    text: "Hello".into(),
                    confidence: 0.9,
                    region: None,
                },
                OcrElement {
                    text: "World".into(),
                    confidence: 0.8,
                    region: None,
                },
            ],
            ocr_fails: false,
            analysis: ImageAnalysis {
                description: "X".into(),
                ..Default::default()
            },
            refinement: TextRefinement {
                corrected_text: "Hello World".into(),
                ..Default::default()
            },
            refinement_times_out: false,
            translated: "Hola Mundo".into(),
        }
    }

    pub fn configure(mut self, f: impl FnOnce(&mut PipelineConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn ocr_elements(mut self, elements: Vec<OcrElement>) -> Self {
        self.ocr_elements = elements;
        self
    }

    pub fn ocr_fails(mut self) -> Self {
        self.ocr_fails = true;
        self
    }

    pub fn refinement(mut self, refinement: TextRefinement) -> Self {
        self.refinement = refinement;
        self
    }

    pub fn refinement_times_out(mut self) -> Self {
        self.refinement_times_out = true;
        self
    }

    pub fn build(self) -> Rig {
        let calls = Arc::new(CallCounts::default());
        let collaborators = Collaborators {
            ocr: Arc::new(ScriptedOcr {
                elements: self.ocr_elements,
                error: self.ocr_fails.then(|| "unreadable image".to_string()),
                calls: Arc::clone(&calls),
            }),
            vision: Arc::new(ScriptedVision {
                analysis: self.analysis,
                error: None,
                calls: Arc::clone(&calls),
            }),
            text: Arc::new(ScriptedText {
                refinement: self.refinement,
                timeout: self.refinement_times_out,
                calls: Arc::clone(&calls),
            }),
            translator: Arc::new(ScriptedTranslator {
                translated: self.translated,
                calls: Arc::clone(&calls),
            }),
        };
        let config = Arc::new(self.config);
        let store = StateStore::new();
        let executor = StepExecutor::new(collaborators, Arc::clone(&config));
        let runner = Arc::new(UnitRunner::new(
            store.clone(),
            executor,
            Arc::clone(&config),
        ));
        Rig {
            dir: tempfile::tempdir().unwrap(),
            config,
            store,
            runner,
            calls,
        }
    }
}
