use anyhow::{Context, Result};
use captionflow::agents::{
    Collaborators, CommandOcrEngine, OllamaClient, OllamaTextAgent, OllamaTranslatorAgent,
    OllamaVisionAgent,
};
use captionflow::cli::commands::{ResetCommand, RunCommand, SingleCommand, StatusCommand};
use captionflow::cli::output::*;
use captionflow::cli::{Cli, Command};
use captionflow::core::state::StepStatus;
use captionflow::pipeline::{BatchProcessor, StepExecutor, UnitRunner};
use captionflow::{PipelineConfig, StateStore, StepKind};
use std::path::Path;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_batch(cmd, &cli).await?,
        Command::Single(cmd) => run_single(cmd, &cli).await?,
        Command::Status(cmd) => show_status(cmd)?,
        Command::Reset(cmd) => reset_steps(cmd).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    match &cli.config {
        Some(path) => {
            PipelineConfig::from_file(path).with_context(|| format!("Failed to load {path}"))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn build_runner(config: Arc<PipelineConfig>) -> Result<UnitRunner> {
    let client = OllamaClient::new(&config.ollama).context("Failed to build Ollama client")?;
    let collaborators = Collaborators {
        ocr: Arc::new(CommandOcrEngine::new(&config.ocr)),
        vision: Arc::new(OllamaVisionAgent::new(client.clone(), &config.ollama)),
        text: Arc::new(OllamaTextAgent::new(client.clone(), &config.ollama)),
        translator: Arc::new(OllamaTranslatorAgent::new(
            client,
            config.translator_model().to_string(),
        )),
    };
    let executor = StepExecutor::new(collaborators, Arc::clone(&config));
    Ok(UnitRunner::new(StateStore::new(), executor, config))
}

async fn run_batch(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    if let Some(workers) = cmd.workers {
        config.batch.workers = workers;
    }
    if cmd.force {
        config.pipeline.force_reprocess = true;
    }
    config.validate()?;

    let config = Arc::new(config);
    let runner = Arc::new(build_runner(Arc::clone(&config))?);
    let processor = BatchProcessor::new(runner, Arc::clone(&config));

    let report = processor.run(Path::new(&cmd.folder)).await?;
    print_batch_summary(&report);
    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_single(cmd: &SingleCommand, cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    cmd.apply_overrides(&mut config);
    config.validate()?;

    let config = Arc::new(config);
    let runner = build_runner(Arc::clone(&config))?;
    let report = runner.process(Path::new(&cmd.image)).await?;

    if cmd.json {
        match &report.state.results.combined {
            Some(combined) => println!("{}", serde_json::to_string_pretty(combined)?),
            None => println!("{}", serde_json::to_string_pretty(&report.state)?),
        }
    } else {
        print_state(&report.state);
    }
    if !report.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn show_status(cmd: &StatusCommand) -> Result<()> {
    let store = StateStore::new();
    let state = store
        .load(Path::new(&cmd.image))?
        .with_context(|| format!("No state file found for {}", cmd.image))?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_state(&state);
    }
    Ok(())
}

async fn reset_steps(cmd: &ResetCommand) -> Result<()> {
    let store = StateStore::new();
    let image = Path::new(&cmd.image);
    let mut state = store
        .load(image)?
        .with_context(|| format!("No state file found for {}", cmd.image))?;

    let targets: Vec<StepKind> = match cmd.step {
        Some(step) => vec![step],
        None => state
            .steps
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .map(|r| r.step)
            .collect(),
    };
    if targets.is_empty() {
        println!("{} No failed steps to reset", INFO);
        return Ok(());
    }
    for step in &targets {
        if state.status_of(*step) != StepStatus::Failed {
            println!("{} {} has not failed, leaving it untouched", WARN, step);
            continue;
        }
        state = state.reset_step(*step);
        println!("{} Reset {}", CHECK, style(step).bold());
    }
    store.save(&state)?;
    print_state(&state);
    Ok(())
}
