//! Resumable image caption extraction pipeline
//!
//! Each image runs through a fixed step sequence (OCR extraction, vision
//! analysis, text refinement, translation, combine) with its progress
//! persisted to a sidecar file after every transition, so interrupted work
//! resumes where it left off instead of starting over.

pub mod agents;
pub mod cli;
pub mod combine;
pub mod core;
pub mod pipeline;
pub mod store;

pub use crate::core::config::{ConfigError, PipelineConfig};
pub use crate::core::outputs::{CombinedRecord, StepOutput};
pub use crate::core::state::{OverallStatus, PipelineState, StepStatus};
pub use crate::core::step::StepKind;
pub use agents::{AgentError, Collaborators};
pub use pipeline::{BatchProcessor, StepExecutor, UnitRunner};
pub use store::{StateStore, StoreError};
