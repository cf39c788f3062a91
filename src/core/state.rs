//! Per-image pipeline state and transitions
//!
//! Transitions are pure snapshot functions (old state in, new state out) so
//! the state machine can be tested without touching disk; persisting the
//! returned snapshot is the caller's job. The overall status is always
//! recomputed from the step records, never set directly.

use crate::core::outputs::{
    CombinedRecord, ExtractionOutput, ImageAnalysis, StepOutput, TextRefinement, Translation,
};
use crate::core::step::{StepKind, PIPELINE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not attempted yet
    Pending,
    /// Collaborator call in flight (retryable if observed after a crash)
    Running,
    /// Finished with output
    Completed,
    /// Finished with an error
    Failed,
    /// Deliberately not run
    Skipped,
}

impl StepStatus {
    /// Terminal statuses never change except through an explicit rerun.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

/// Unit-level status, derived from the step statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Execution record for one step of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: StepKind,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl StepRecord {
    fn new(step: StepKind) -> Self {
        Self {
            step,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_secs: None,
            error: None,
            skip_reason: None,
        }
    }
}

/// Typed results block, one slot per step.
///
/// A slot is `Some` iff the matching step record is `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StepResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ImageAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement: Option<TextRefinement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined: Option<CombinedRecord>,
}

/// Aggregate metadata carried alongside the step records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StateMetadata {
    /// Sum of completed step durations in seconds
    pub total_processing_time: f64,
    pub failed_steps: Vec<StepKind>,
    /// How many manual reruns have been requested for this unit
    pub reruns: u32,
}

/// Why `should_skip` decided a step should not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyCompleted,
    Disabled,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyCompleted => "already completed",
            SkipReason::Disabled => "disabled by configuration",
        }
    }
}

/// Durable per-unit pipeline state.
///
/// Serialized to a YAML sidecar file next to the image; that file is both
/// the resume checkpoint and the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub image_path: String,
    pub image_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub overall_status: OverallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepKind>,
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub results: StepResults,
    #[serde(default)]
    pub metadata: StateMetadata,
}

impl PipelineState {
    /// Fresh state for a unit seen for the first time: everything pending.
    pub fn new(image_path: &Path) -> Self {
        let now = Utc::now();
        Self {
            image_path: image_path.display().to_string(),
            image_name: image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            created_at: now,
            updated_at: now,
            overall_status: OverallStatus::Pending,
            current_step: Some(StepKind::Extraction),
            steps: StepKind::ALL.iter().map(|k| StepRecord::new(*k)).collect(),
            results: StepResults::default(),
            metadata: StateMetadata::default(),
        }
    }

    /// Check that the step records are exactly the fixed pipeline, in
    /// order. Loaded sidecars are hand-editable, so a truncated or
    /// reordered list must be rejected before any indexed access.
    pub fn validate(&self) -> Result<(), String> {
        if self.steps.len() != StepKind::ALL.len() {
            return Err(format!(
                "expected {} step records, found {}",
                StepKind::ALL.len(),
                self.steps.len()
            ));
        }
        for (record, kind) in self.steps.iter().zip(StepKind::ALL) {
            if record.step != kind {
                return Err(format!(
                    "step record out of order: expected {kind}, found {}",
                    record.step
                ));
            }
        }
        Ok(())
    }

    pub fn record(&self, step: StepKind) -> &StepRecord {
        &self.steps[step as usize]
    }

    fn record_mut(&mut self, step: StepKind) -> &mut StepRecord {
        &mut self.steps[step as usize]
    }

    pub fn status_of(&self, step: StepKind) -> StepStatus {
        self.record(step).status
    }

    /// Derive the unit-level status from the step records.
    ///
    /// Completed iff every required step is completed or skipped and every
    /// optional step is terminal; failed iff any required step failed;
    /// running iff any step is running; pending otherwise.
    pub fn derive_overall(&self) -> OverallStatus {
        let completed = PIPELINE.iter().all(|def| {
            let status = self.status_of(def.kind);
            if def.required {
                matches!(status, StepStatus::Completed | StepStatus::Skipped)
            } else {
                status.is_terminal()
            }
        });
        if completed {
            return OverallStatus::Completed;
        }
        if PIPELINE
            .iter()
            .any(|def| def.required && self.status_of(def.kind) == StepStatus::Failed)
        {
            return OverallStatus::Failed;
        }
        if self.steps.iter().any(|r| r.status == StepStatus::Running) {
            return OverallStatus::Running;
        }
        OverallStatus::Pending
    }

    /// Whether the whole unit has already finished successfully.
    pub fn is_completed(&self) -> bool {
        self.overall_status == OverallStatus::Completed
    }

    /// Decide whether a step should run at all.
    ///
    /// `force` bypasses the already-completed skip, never the disabled one.
    pub fn should_skip(&self, step: StepKind, enabled: bool, force: bool) -> Option<SkipReason> {
        if !enabled {
            return Some(SkipReason::Disabled);
        }
        if !force && self.status_of(step) == StepStatus::Completed {
            return Some(SkipReason::AlreadyCompleted);
        }
        None
    }

    /// Mark a step running. Clears any stale output or error from a previous
    /// attempt so re-invoking a failed step overwrites the old record.
    pub fn mark_running(mut self, step: StepKind) -> Self {
        {
            let rec = self.record_mut(step);
            rec.status = StepStatus::Running;
            rec.started_at = Some(Utc::now());
            rec.completed_at = None;
            rec.duration_secs = None;
            rec.error = None;
            rec.skip_reason = None;
        }
        self.clear_result(step);
        self.current_step = Some(step);
        self.recompute();
        self
    }

    /// Mark a step completed with its output.
    pub fn mark_completed(mut self, output: StepOutput, duration_secs: f64) -> Self {
        let step = output.kind();
        {
            let rec = self.record_mut(step);
            rec.status = StepStatus::Completed;
            rec.completed_at = Some(Utc::now());
            rec.duration_secs = Some(duration_secs);
            rec.error = None;
            rec.skip_reason = None;
        }
        match output {
            StepOutput::Extraction(out) => self.results.extraction = Some(out),
            StepOutput::Analysis(out) => self.results.analysis = Some(out),
            StepOutput::Refinement(out) => self.results.refinement = Some(out),
            StepOutput::Translation(out) => self.results.translation = Some(out),
            StepOutput::Combine(out) => self.results.combined = Some(out),
        }
        self.metadata.failed_steps.retain(|s| *s != step);
        self.recompute();
        self
    }

    /// Mark a step failed with a human-readable message and the measured
    /// duration of the failed attempt.
    pub fn mark_failed(
        mut self,
        step: StepKind,
        error: impl Into<String>,
        duration_secs: f64,
    ) -> Self {
        {
            let rec = self.record_mut(step);
            rec.status = StepStatus::Failed;
            rec.completed_at = Some(Utc::now());
            rec.duration_secs = Some(duration_secs);
            rec.error = Some(error.into());
        }
        self.clear_result(step);
        if !self.metadata.failed_steps.contains(&step) {
            self.metadata.failed_steps.push(step);
        }
        self.recompute();
        self
    }

    /// Mark a step skipped with a reason.
    pub fn mark_skipped(mut self, step: StepKind, reason: impl Into<String>) -> Self {
        {
            let rec = self.record_mut(step);
            rec.status = StepStatus::Skipped;
            rec.completed_at = Some(Utc::now());
            rec.skip_reason = Some(reason.into());
        }
        self.recompute();
        self
    }

    /// Manual rerun: put a failed step back to pending and count the rerun.
    /// A step that has not failed is left untouched.
    pub fn reset_step(mut self, step: StepKind) -> Self {
        if self.status_of(step) != StepStatus::Failed {
            return self;
        }
        *self.record_mut(step) = StepRecord::new(step);
        self.clear_result(step);
        self.metadata.failed_steps.retain(|s| *s != step);
        self.metadata.reruns += 1;
        self.recompute();
        self
    }

    /// Demote any `running` step back to pending. A step observed running in
    /// a freshly loaded snapshot was interrupted mid-call, and the attempt
    /// should simply be retried.
    pub fn recover_interrupted(mut self) -> Self {
        let interrupted: Vec<StepKind> = self
            .steps
            .iter()
            .filter(|r| r.status == StepStatus::Running)
            .map(|r| r.step)
            .collect();
        for step in interrupted {
            *self.record_mut(step) = StepRecord::new(step);
            self.clear_result(step);
        }
        self.recompute();
        self
    }

    fn clear_result(&mut self, step: StepKind) {
        match step {
            StepKind::Extraction => self.results.extraction = None,
            StepKind::Analysis => self.results.analysis = None,
            StepKind::Refinement => self.results.refinement = None,
            StepKind::Translation => self.results.translation = None,
            StepKind::Combine => self.results.combined = None,
        }
    }

    fn recompute(&mut self) {
        self.updated_at = Utc::now();
        self.overall_status = self.derive_overall();
        self.metadata.total_processing_time = self
            .steps
            .iter()
            .filter_map(|r| r.duration_secs)
            .sum::<f64>();
        if self.overall_status == OverallStatus::Completed {
            self.current_step = None;
        }
    }
}
