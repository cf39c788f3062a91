//! Batch orchestration over a folder of images
//!
//! Discovers images, then drains a shared queue with a fixed pool of
//! workers. Each image is independent; one unit failing never stops the
//! batch, but a persistence error aborts the run since no further progress
//! can be recorded.

use crate::core::config::PipelineConfig;
use crate::core::state::OverallStatus;
use crate::pipeline::runner::UnitRunner;
use crate::store::StoreError;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to scan folder {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no supported images found in {0}")]
    Empty(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("worker panicked: {0}")]
    Worker(String),
}

/// Outcome counters for one batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed_secs: f64,
}

pub struct BatchProcessor {
    runner: Arc<UnitRunner>,
    config: Arc<PipelineConfig>,
}

impl BatchProcessor {
    pub fn new(runner: Arc<UnitRunner>, config: Arc<PipelineConfig>) -> Self {
        Self { runner, config }
    }

    /// Recursively collect supported images under a folder, sorted by path
    /// so runs are deterministic.
    pub fn discover_images(&self, folder: &Path) -> Result<Vec<PathBuf>, BatchError> {
        let mut images = Vec::new();
        let mut stack = vec![folder.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let entries = std::fs::read_dir(&dir).map_err(|e| BatchError::Scan {
                path: dir.clone(),
                source: e,
            })?;
            for entry in entries {
                let entry = entry.map_err(|e| BatchError::Scan {
                    path: dir.clone(),
                    source: e,
                })?;
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if self.config.is_supported_image(&path) {
                    images.push(path);
                }
            }
        }
        images.sort();
        Ok(images)
    }

    /// Process every image under `folder` with the configured worker pool.
    pub async fn run(&self, folder: &Path) -> Result<BatchReport, BatchError> {
        let images = self.discover_images(folder)?;
        if images.is_empty() {
            return Err(BatchError::Empty(folder.to_path_buf()));
        }

        let run_id = Uuid::new_v4();
        let total = images.len();
        let workers = self.config.batch.workers.min(total);
        info!(%run_id, total, workers, folder = %folder.display(), "starting batch");

        let progress = if self.config.batch.show_progress {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let queue = Arc::new(Mutex::new(VecDeque::from(images)));
        let processed = Arc::new(AtomicUsize::new(0));
        let succeeded = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let skipped = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let runner = Arc::clone(&self.runner);
            let queue = Arc::clone(&queue);
            let processed = Arc::clone(&processed);
            let succeeded = Arc::clone(&succeeded);
            let failed = Arc::clone(&failed);
            let skipped = Arc::clone(&skipped);
            let progress = progress.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let image = {
                        let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
                        queue.pop_front()
                    };
                    let Some(image) = image else { break };

                    progress.set_message(
                        image
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                    );
                    let report = match runner.process(&image).await {
                        Ok(report) => report,
                        Err(e) => {
                            // Stop the other workers too: state can no
                            // longer be recorded reliably
                            queue.lock().unwrap_or_else(|p| p.into_inner()).clear();
                            return Err(e);
                        }
                    };

                    processed.fetch_add(1, Ordering::Relaxed);
                    if report.short_circuited {
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    match report.state.overall_status {
                        OverallStatus::Completed => {
                            succeeded.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    progress.inc(1);
                }
                Ok::<(), StoreError>(())
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(store_err)) => {
                    // State can no longer be recorded; stop the whole run
                    error!(error = %store_err, "aborting batch on persistence failure");
                    progress.abandon();
                    return Err(store_err.into());
                }
                Err(join_err) => {
                    progress.abandon();
                    return Err(BatchError::Worker(join_err.to_string()));
                }
            }
        }
        progress.finish_and_clear();

        let report = BatchReport {
            run_id,
            total,
            processed: processed.load(Ordering::Relaxed),
            succeeded: succeeded.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
            skipped: skipped.load(Ordering::Relaxed),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            %run_id,
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            "batch finished"
        );
        Ok(report)
    }
}
