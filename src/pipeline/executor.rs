//! Single-step execution against the collaborators
//!
//! The executor knows how to run each step kind and nothing about
//! persistence: it reads inputs from the passed-in state snapshot and
//! reports an outcome, leaving the transition and the save to the runner.

use crate::agents::Collaborators;
use crate::core::config::PipelineConfig;
use crate::core::outputs::StepOutput;
use crate::core::state::PipelineState;
use crate::core::step::StepKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// What happened when a step was executed.
#[derive(Debug)]
pub enum StepOutcome {
    Completed {
        output: StepOutput,
        duration_secs: f64,
    },
    /// The step decided at runtime it had nothing to do
    Skipped(String),
    Failed {
        error: String,
        duration_secs: f64,
    },
}

pub struct StepExecutor {
    collaborators: Collaborators,
    config: Arc<PipelineConfig>,
}

impl StepExecutor {
    pub fn new(collaborators: Collaborators, config: Arc<PipelineConfig>) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Run one step for one image. Collaborator errors become a `Failed`
    /// outcome, never a panic or an early return; the caller decides what a
    /// failure means for the unit.
    pub async fn execute(
        &self,
        step: StepKind,
        state: &PipelineState,
        image: &Path,
    ) -> StepOutcome {
        let started = Instant::now();
        let result = match step {
            StepKind::Extraction => self.run_extraction(image).await,
            StepKind::Analysis => self.run_analysis(image).await,
            StepKind::Refinement => return self.run_refinement(state, started).await,
            StepKind::Translation => return self.run_translation(state, started).await,
            StepKind::Combine => Ok(StepOutput::Combine(crate::combine::combine(state))),
        };
        Self::finish(step, result, started)
    }

    fn finish(
        step: StepKind,
        result: Result<StepOutput, String>,
        started: Instant,
    ) -> StepOutcome {
        let duration_secs = started.elapsed().as_secs_f64();
        match result {
            Ok(output) => {
                info!(step = %step, duration_secs, "step completed");
                StepOutcome::Completed {
                    output,
                    duration_secs,
                }
            }
            Err(error) => {
                warn!(step = %step, duration_secs, %error, "step failed");
                StepOutcome::Failed {
                    error,
                    duration_secs,
                }
            }
        }
    }

    async fn run_extraction(&self, image: &Path) -> Result<StepOutput, String> {
        self.collaborators
            .ocr
            .extract(image)
            .await
            .map(StepOutput::Extraction)
            .map_err(|e| e.to_string())
    }

    async fn run_analysis(&self, image: &Path) -> Result<StepOutput, String> {
        self.collaborators
            .vision
            .analyze(image)
            .await
            .map(StepOutput::Analysis)
            .map_err(|e| e.to_string())
    }

    /// Refinement feeds on extracted text, falling back to the text the
    /// vision model saw. With neither available there is nothing to refine.
    async fn run_refinement(&self, state: &PipelineState, started: Instant) -> StepOutcome {
        let base_text = state
            .results
            .extraction
            .as_ref()
            .map(|e| e.full_text.as_str())
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                state
                    .results
                    .analysis
                    .as_ref()
                    .map(|a| a.text.as_str())
                    .filter(|t| !t.trim().is_empty())
            });
        let Some(text) = base_text else {
            return StepOutcome::Skipped("no text available to refine".to_string());
        };
        let result = self
            .collaborators
            .text
            .refine(text, state.results.analysis.as_ref())
            .await
            .map(StepOutput::Refinement)
            .map_err(|e| e.to_string());
        Self::finish(StepKind::Refinement, result, started)
    }

    /// Translation only runs when refinement flagged the text as
    /// non-target-language.
    async fn run_translation(&self, state: &PipelineState, started: Instant) -> StepOutcome {
        let Some(refinement) = state.results.refinement.as_ref() else {
            return StepOutcome::Skipped("no refined text to translate".to_string());
        };
        if refinement.corrected_text.trim().is_empty() {
            return StepOutcome::Skipped("no refined text to translate".to_string());
        }
        if !refinement.needs_translation {
            return StepOutcome::Skipped(format!(
                "text already in {}",
                self.config.ollama.target_language
            ));
        }
        let result = self
            .collaborators
            .translator
            .translate(
                &refinement.corrected_text,
                &self.config.ollama.target_language,
            )
            .await
            .map(|mut translation| {
                if translation.source_language.is_empty() {
                    translation.source_language = refinement.language.clone();
                }
                StepOutput::Translation(translation)
            })
            .map_err(|e| e.to_string());
        Self::finish(StepKind::Translation, result, started)
    }
}
