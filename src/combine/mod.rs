//! Result aggregation
//!
//! Builds the final combined record for a unit from whatever its state
//! currently holds. Pure function of the state: no collaborator calls, no
//! filesystem access, and it runs even when earlier steps failed so partial
//! results are never thrown away.

use crate::core::outputs::{AlternativeText, CombinedRecord, CombinedSummary, UnifiedText};
use crate::core::state::PipelineState;
use chrono::Utc;

/// Derive the combined record from a state snapshot.
///
/// The unified text picks the best available source in priority order:
/// refined text, then raw extraction, then whatever text the vision model
/// saw. Lower-priority non-empty texts are kept as alternatives.
pub fn combine(state: &PipelineState) -> CombinedRecord {
    let results = &state.results;

    let mut candidates: Vec<AlternativeText> = Vec::new();
    if let Some(refinement) = &results.refinement {
        if !refinement.corrected_text.trim().is_empty() {
            candidates.push(AlternativeText {
                source: "refinement".to_string(),
                text: refinement.corrected_text.clone(),
            });
        }
    }
    if let Some(extraction) = &results.extraction {
        if !extraction.full_text.trim().is_empty() {
            candidates.push(AlternativeText {
                source: "extraction".to_string(),
                text: extraction.full_text.clone(),
            });
        }
    }
    if let Some(analysis) = &results.analysis {
        if !analysis.text.trim().is_empty() {
            candidates.push(AlternativeText {
                source: "analysis".to_string(),
                text: analysis.text.clone(),
            });
        }
    }

    let unified_text = match candidates.split_first() {
        Some((primary, rest)) => UnifiedText {
            primary_text: primary.text.clone(),
            recommended_source: primary.source.clone(),
            alternative_texts: rest.to_vec(),
        },
        None => UnifiedText::default(),
    };

    let summary = CombinedSummary {
        has_extraction: results.extraction.is_some(),
        has_analysis: results.analysis.is_some(),
        has_refinement: results.refinement.is_some(),
        has_translation: results.translation.is_some(),
        text_length: unified_text.primary_text.len(),
        extraction_avg_confidence: results.extraction.as_ref().map(|e| e.avg_confidence),
        refinement_confidence: results.refinement.as_ref().map(|r| r.confidence),
    };

    CombinedRecord {
        image_file: state.image_name.clone(),
        image_path: state.image_path.clone(),
        processed_at: Utc::now().to_rfc3339(),
        total_duration_secs: state
            .steps
            .iter()
            .filter_map(|r| r.duration_secs)
            .sum::<f64>(),
        extraction: results.extraction.clone(),
        analysis: results.analysis.clone(),
        refinement: results.refinement.clone(),
        translation: results.translation.clone(),
        unified_text,
        summary,
        failed_steps: state.metadata.failed_steps.clone(),
    }
}
