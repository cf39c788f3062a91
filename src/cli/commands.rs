//! CLI command definitions

use crate::core::config::PipelineConfig;
use crate::core::step::StepKind;
use clap::Args;

/// Process a folder of images
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Folder to scan for images (recursive)
    #[arg(short, long)]
    pub folder: String,

    /// Worker pool size override
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Re-run steps even when they already completed
    #[arg(long)]
    pub force: bool,
}

/// Process a single image
#[derive(Debug, Args, Clone)]
pub struct SingleCommand {
    /// Path to the image
    #[arg(short, long)]
    pub image: String,

    /// Re-run steps even when they already completed
    #[arg(long)]
    pub force: bool,

    /// Enable translation for this run
    #[arg(long)]
    pub enable_translation: bool,

    /// Skip the vision analysis step
    #[arg(long)]
    pub no_analysis: bool,

    /// Skip the text refinement step
    #[arg(long)]
    pub no_refinement: bool,

    /// Vision model override
    #[arg(long)]
    pub vision_model: Option<String>,

    /// Text model override
    #[arg(long)]
    pub text_model: Option<String>,

    /// Print the combined record as JSON
    #[arg(long)]
    pub json: bool,
}

impl SingleCommand {
    /// Fold the per-run flags into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        if self.force {
            config.pipeline.force_reprocess = true;
        }
        if self.enable_translation {
            config.pipeline.enable_translation = true;
        }
        if self.no_analysis {
            config.pipeline.enable_analysis = false;
        }
        if self.no_refinement {
            config.pipeline.enable_refinement = false;
        }
        if let Some(model) = &self.vision_model {
            config.ollama.vision_model = model.clone();
        }
        if let Some(model) = &self.text_model {
            config.ollama.text_model = model.clone();
        }
    }
}

/// Show the stored state of an image
#[derive(Debug, Args, Clone)]
pub struct StatusCommand {
    /// Path to the image
    #[arg(short, long)]
    pub image: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Reset failed steps so the next run retries them
#[derive(Debug, Args, Clone)]
pub struct ResetCommand {
    /// Path to the image
    #[arg(short, long)]
    pub image: String,

    /// Specific step to reset; with no step, every failed step is reset
    #[arg(short, long, value_enum)]
    pub step: Option<StepKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_overrides() {
        let cmd = SingleCommand {
            image: "a.png".into(),
            force: true,
            enable_translation: true,
            no_analysis: true,
            no_refinement: false,
            vision_model: Some("llava:13b".into()),
            text_model: None,
            json: false,
        };
        let mut config = PipelineConfig::default();
        cmd.apply_overrides(&mut config);
        assert!(config.pipeline.force_reprocess);
        assert!(config.pipeline.enable_translation);
        assert!(!config.pipeline.enable_analysis);
        assert!(config.pipeline.enable_refinement);
        assert_eq!(config.ollama.vision_model, "llava:13b");
    }
}
