//! CLI output formatting

use crate::core::state::{OverallStatus, PipelineState, StepStatus};
use crate::pipeline::BatchReport;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");

/// Format a step status for display
pub fn format_step_status(status: StepStatus) -> String {
    match status {
        StepStatus::Pending => style("PENDING").dim().to_string(),
        StepStatus::Running => style("RUNNING").yellow().to_string(),
        StepStatus::Completed => style("COMPLETED").green().to_string(),
        StepStatus::Failed => style("FAILED").red().to_string(),
        StepStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format an overall status for display
pub fn format_overall_status(status: OverallStatus) -> String {
    match status {
        OverallStatus::Pending => style("PENDING").dim().to_string(),
        OverallStatus::Running => style("RUNNING").yellow().to_string(),
        OverallStatus::Completed => style("COMPLETED").green().to_string(),
        OverallStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Print a per-step status table for one image.
pub fn print_state(state: &PipelineState) {
    println!(
        "{} {} ({})",
        INFO,
        style(&state.image_name).bold(),
        format_overall_status(state.overall_status)
    );
    for record in &state.steps {
        let mut line = format!(
            "  {:<12} {}",
            record.step.to_string(),
            format_step_status(record.status)
        );
        if let Some(duration) = record.duration_secs {
            line.push_str(&format!(" ({duration:.2}s)"));
        }
        if let Some(error) = &record.error {
            line.push_str(&format!(" {}", style(error).red()));
        }
        if let Some(reason) = &record.skip_reason {
            line.push_str(&format!(" {}", style(reason).dim()));
        }
        println!("{line}");
    }
    if let Some(combined) = &state.results.combined {
        let text = &combined.unified_text.primary_text;
        if !text.is_empty() {
            println!(
                "  {:<12} {} (from {})",
                "text",
                style(text).cyan(),
                combined.unified_text.recommended_source
            );
        }
    }
}

/// Print the closing summary of a batch run.
pub fn print_batch_summary(report: &BatchReport) {
    println!();
    println!(
        "{} Batch {} finished in {:.1}s",
        INFO,
        style(report.run_id).dim(),
        report.elapsed_secs
    );
    println!(
        "  {} {} completed, {} {} failed, {} already done of {} total",
        CHECK,
        style(report.succeeded).green(),
        CROSS,
        style(report.failed).red(),
        style(report.skipped).dim(),
        report.total
    );
}
