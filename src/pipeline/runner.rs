//! Per-image pipeline runner
//!
//! Drives one image through the step sequence, persisting the state before
//! and after every collaborator call so a crash at any point leaves a
//! resumable sidecar behind. Step failures never abort the loop; only a
//! persistence failure does.

use crate::core::config::PipelineConfig;
use crate::core::state::{PipelineState, SkipReason, StepStatus};
use crate::core::step::{StepKind, PIPELINE};
use crate::pipeline::executor::{StepExecutor, StepOutcome};
use crate::store::{StateStore, StoreError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// What processing one image produced.
#[derive(Debug)]
pub struct UnitReport {
    pub image: PathBuf,
    pub state: PipelineState,
    /// True when the unit was already complete and nothing ran
    pub short_circuited: bool,
}

impl UnitReport {
    pub fn succeeded(&self) -> bool {
        self.state.is_completed()
    }
}

pub struct UnitRunner {
    store: StateStore,
    executor: StepExecutor,
    config: Arc<PipelineConfig>,
}

impl UnitRunner {
    pub fn new(store: StateStore, executor: StepExecutor, config: Arc<PipelineConfig>) -> Self {
        Self {
            store,
            executor,
            config,
        }
    }

    /// Process one image end to end, resuming from its sidecar if present.
    pub async fn process(&self, image: &Path) -> Result<UnitReport, StoreError> {
        let mut state = self.store.load_or_create(image)?;
        let force = self.config.pipeline.force_reprocess;

        // Fully finished units are returned as-is; their stored combined
        // record is the answer and no collaborator is contacted.
        if state.is_completed() && !force {
            debug!(image = %image.display(), "already completed, skipping");
            return Ok(UnitReport {
                image: image.to_path_buf(),
                state,
                short_circuited: true,
            });
        }

        let had_interrupted = state
            .steps
            .iter()
            .any(|r| r.status == StepStatus::Running);
        if had_interrupted {
            info!(image = %image.display(), "recovering steps interrupted by a crash");
            state = state.recover_interrupted();
        }

        for def in &PIPELINE {
            let step = def.kind;
            // Combine always re-derives its record so late reruns are
            // reflected; other completed steps are left untouched.
            let force_step = force || step == StepKind::Combine;
            match state.should_skip(step, self.config.enabled(step), force_step) {
                Some(SkipReason::AlreadyCompleted) => {
                    debug!(step = %step, "step already completed");
                    continue;
                }
                Some(SkipReason::Disabled) => {
                    if state.status_of(step) != StepStatus::Skipped {
                        state = state.mark_skipped(step, SkipReason::Disabled.as_str());
                        self.store.save(&state)?;
                    }
                    continue;
                }
                None => {}
            }

            state = state.mark_running(step);
            self.store.save(&state)?;

            state = match self.executor.execute(step, &state, image).await {
                StepOutcome::Completed {
                    output,
                    duration_secs,
                } => state.mark_completed(output, duration_secs),
                StepOutcome::Skipped(reason) => state.mark_skipped(step, reason),
                StepOutcome::Failed {
                    error,
                    duration_secs,
                } => state.mark_failed(step, error, duration_secs),
            };
            self.store.save(&state)?;
        }

        info!(
            image = %image.display(),
            status = ?state.overall_status,
            "unit finished"
        );
        Ok(UnitReport {
            image: image.to_path_buf(),
            state,
            short_circuited: false,
        })
    }

    /// Reset a failed step so the next run re-attempts it.
    pub async fn reset(&self, image: &Path, step: StepKind) -> Result<PipelineState, StoreError> {
        let state = self.store.load_or_create(image)?.reset_step(step);
        self.store.save(&state)?;
        Ok(state)
    }
}
