//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ResetCommand, RunCommand, SingleCommand, StatusCommand};
use std::ffi::OsString;

/// Resumable image caption extraction pipeline
#[derive(Debug, Parser, Clone)]
#[command(name = "captionflow")]
#[command(version = "0.1.0")]
#[command(about = "Extract, refine, and translate text from images", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Process a folder of images
    Run(RunCommand),

    /// Process a single image
    Single(SingleCommand),

    /// Show the stored state of an image
    Status(StatusCommand),

    /// Reset failed steps so the next run retries them
    Reset(ResetCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["captionflow", "run", "--folder", "photos"]).unwrap();
        match cli.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.folder, "photos");
                assert!(cmd.workers.is_none());
                assert!(!cmd.force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_single_with_overrides() {
        let cli = Cli::try_parse_from([
            "captionflow",
            "single",
            "--image",
            "sign.jpg",
            "--enable-translation",
            "--vision-model",
            "llava:13b",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Single(cmd) => {
                assert_eq!(cmd.image, "sign.jpg");
                assert!(cmd.enable_translation);
                assert_eq!(cmd.vision_model.as_deref(), Some("llava:13b"));
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_reset_specific_step() {
        let cli =
            Cli::try_parse_from(["captionflow", "reset", "--image", "a.png", "--step", "refinement"])
                .unwrap();
        match cli.command {
            Command::Reset(cmd) => {
                assert_eq!(cmd.step, Some(crate::core::step::StepKind::Refinement));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
