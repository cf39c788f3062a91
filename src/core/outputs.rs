//! Typed step output payloads
//!
//! Every payload is serialized into the per-image state file, so these types
//! double as the on-disk results schema.

use crate::core::step::StepKind;
use serde::{Deserialize, Serialize};

/// One text element found by the extraction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrElement {
    pub text: String,
    pub confidence: f64,
    /// Bounding region as `[x, y, width, height]`
    #[serde(default)]
    pub region: Option<[f64; 4]>,
}

/// Output of the primary extraction step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractionOutput {
    pub elements: Vec<OcrElement>,
    pub full_text: String,
    pub total_elements: usize,
    pub avg_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
}

impl ExtractionOutput {
    /// Build the aggregate view from raw elements.
    pub fn from_elements(elements: Vec<OcrElement>) -> Self {
        let full_text = elements
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let total_elements = elements.len();
        let (mut min, mut max, mut sum) = (f64::MAX, f64::MIN, 0.0);
        for e in &elements {
            min = min.min(e.confidence);
            max = max.max(e.confidence);
            sum += e.confidence;
        }
        let (min_confidence, max_confidence, avg_confidence) = if total_elements == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (min, max, sum / total_elements as f64)
        };
        Self {
            elements,
            full_text,
            total_elements,
            avg_confidence,
            min_confidence,
            max_confidence,
        }
    }
}

/// Output of the vision-model analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ImageAnalysis {
    pub description: String,
    pub scene: String,
    /// Text the vision model saw in the image
    pub text: String,
    pub story: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Confidence the refinement model reported for its corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefinementConfidence {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

/// Output of the text refinement step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TextRefinement {
    pub corrected_text: String,
    pub changes: String,
    pub confidence: RefinementConfidence,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub needs_translation: bool,
    #[serde(default)]
    pub model: Option<String>,
}

/// Output of the translation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Translation {
    pub translated_text: String,
    #[serde(default)]
    pub source_language: String,
    pub target_language: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Best-available text chosen by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UnifiedText {
    pub primary_text: String,
    /// Which step the primary text came from
    pub recommended_source: String,
    pub alternative_texts: Vec<AlternativeText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeText {
    pub source: String,
    pub text: String,
}

/// Aggregate indicators over the combined record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CombinedSummary {
    pub has_extraction: bool,
    pub has_analysis: bool,
    pub has_refinement: bool,
    pub has_translation: bool,
    pub text_length: usize,
    #[serde(default)]
    pub extraction_avg_confidence: Option<f64>,
    #[serde(default)]
    pub refinement_confidence: Option<RefinementConfidence>,
}

/// The final combined record the aggregator derives from a unit's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecord {
    pub image_file: String,
    pub image_path: String,
    pub processed_at: String,
    /// Sum of per-step durations in seconds
    pub total_duration_secs: f64,
    #[serde(default)]
    pub extraction: Option<ExtractionOutput>,
    #[serde(default)]
    pub analysis: Option<ImageAnalysis>,
    #[serde(default)]
    pub refinement: Option<TextRefinement>,
    #[serde(default)]
    pub translation: Option<Translation>,
    pub unified_text: UnifiedText,
    pub summary: CombinedSummary,
    pub failed_steps: Vec<StepKind>,
}

/// A completed step's output, tagged by stage.
///
/// Carried between the executor and the state transitions; the state stores
/// each variant in its own slot of the results block.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    Extraction(ExtractionOutput),
    Analysis(ImageAnalysis),
    Refinement(TextRefinement),
    Translation(Translation),
    Combine(CombinedRecord),
}

impl StepOutput {
    /// The step this output belongs to.
    pub fn kind(&self) -> StepKind {
        match self {
            StepOutput::Extraction(_) => StepKind::Extraction,
            StepOutput::Analysis(_) => StepKind::Analysis,
            StepOutput::Refinement(_) => StepKind::Refinement,
            StepOutput::Translation(_) => StepKind::Translation,
            StepOutput::Combine(_) => StepKind::Combine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_from_elements() {
        let out = ExtractionOutput::from_elements(vec![
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
        ]);
        assert_eq!(out.full_text, "Hello World");
        assert_eq!(out.total_elements, 2);
        assert!((out.avg_confidence - 0.85).abs() < 1e-9);
        assert!((out.min_confidence - 0.8).abs() < 1e-9);
        assert!((out.max_confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_extraction_from_no_elements() {
        let out = ExtractionOutput::from_elements(vec![]);
        assert_eq!(out.full_text, "");
        assert_eq!(out.total_elements, 0);
        assert_eq!(out.avg_confidence, 0.0);
    }
}
