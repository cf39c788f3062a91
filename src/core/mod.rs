//! Core domain model: pipeline steps, per-image state, configuration

pub mod config;
pub mod outputs;
pub mod state;
pub mod step;

pub use config::PipelineConfig;
pub use outputs::{
    CombinedRecord, ExtractionOutput, ImageAnalysis, OcrElement, StepOutput, TextRefinement,
    Translation,
};
pub use state::{OverallStatus, PipelineState, SkipReason, StepRecord, StepStatus};
pub use step::{StepDefinition, StepKind};
