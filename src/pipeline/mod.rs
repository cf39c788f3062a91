//! Pipeline execution
//!
//! The executor runs a single step against the collaborators, the runner
//! drives one image through the whole step sequence with persistence at every
//! transition, and the batch processor fans the runner out over a folder.

pub mod batch;
pub mod executor;
pub mod runner;

pub use batch::{BatchError, BatchProcessor, BatchReport};
pub use executor::{StepExecutor, StepOutcome};
pub use runner::{UnitReport, UnitRunner};
