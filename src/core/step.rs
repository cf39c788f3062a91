//! Step definitions for the fixed five-stage pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Primary text extraction (OCR)
    Extraction,
    /// Vision-model image analysis
    Analysis,
    /// LLM correction of the extracted text
    Refinement,
    /// Translation of refined text to the target language
    Translation,
    /// Combination of all step outputs into one record
    Combine,
}

impl StepKind {
    /// All steps in pipeline order.
    pub const ALL: [StepKind; 5] = [
        StepKind::Extraction,
        StepKind::Analysis,
        StepKind::Refinement,
        StepKind::Translation,
        StepKind::Combine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Extraction => "extraction",
            StepKind::Analysis => "analysis",
            StepKind::Refinement => "refinement",
            StepKind::Translation => "translation",
            StepKind::Combine => "combine",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct StepDefinition {
    /// Position in the pipeline (0-based)
    pub index: usize,

    /// Which stage this is
    pub kind: StepKind,

    /// Required steps fail the whole unit when they fail
    pub required: bool,

    /// Steps whose output this stage consumes
    pub depends_on: &'static [StepKind],
}

/// The fixed pipeline, in execution order.
pub const PIPELINE: [StepDefinition; 5] = [
    StepDefinition {
        index: 0,
        kind: StepKind::Extraction,
        required: true,
        depends_on: &[],
    },
    StepDefinition {
        index: 1,
        kind: StepKind::Analysis,
        required: false,
        depends_on: &[],
    },
    StepDefinition {
        index: 2,
        kind: StepKind::Refinement,
        required: false,
        depends_on: &[StepKind::Extraction, StepKind::Analysis],
    },
    StepDefinition {
        index: 3,
        kind: StepKind::Translation,
        required: false,
        depends_on: &[StepKind::Refinement],
    },
    StepDefinition {
        index: 4,
        kind: StepKind::Combine,
        required: true,
        depends_on: &[
            StepKind::Extraction,
            StepKind::Analysis,
            StepKind::Refinement,
            StepKind::Translation,
        ],
    },
];

impl StepDefinition {
    /// Look up the definition for a step.
    pub fn for_kind(kind: StepKind) -> &'static StepDefinition {
        &PIPELINE[kind as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_order_matches_all() {
        for (i, def) in PIPELINE.iter().enumerate() {
            assert_eq!(def.index, i);
            assert_eq!(def.kind, StepKind::ALL[i]);
        }
    }

    #[test]
    fn test_dependencies_point_backwards() {
        for def in &PIPELINE {
            for dep in def.depends_on {
                assert!(
                    StepDefinition::for_kind(*dep).index < def.index,
                    "{} depends on later step {}",
                    def.kind,
                    dep
                );
            }
        }
    }

    #[test]
    fn test_required_steps() {
        assert!(StepDefinition::for_kind(StepKind::Extraction).required);
        assert!(StepDefinition::for_kind(StepKind::Combine).required);
        assert!(!StepDefinition::for_kind(StepKind::Analysis).required);
        assert!(!StepDefinition::for_kind(StepKind::Refinement).required);
        assert!(!StepDefinition::for_kind(StepKind::Translation).required);
    }
}
