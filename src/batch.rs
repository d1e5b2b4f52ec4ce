//! Batch orchestration: discover inputs, fan them out to a bounded set of
//! blocking workers, and count completions in whatever order they arrive.

use std::fmt::{Display, Formatter};

use frame_transcoder::{TranscodeOutcome, VideoTask};
use futures::StreamExt;

use crate::{config::BatchConfig, discovery, progress::BatchProgress};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub total: u64,
    /// Final value of the progress counter.
    pub completed: u64,
    pub converted: u64,
    pub source_unavailable: u64,
    pub destination_unavailable: u64,
    pub failed: u64,
    /// Frames decoded but not written because their color conversion failed.
    pub dropped_frames: u64,
}

impl BatchReport {
    fn record(&mut self, outcome: &TranscodeOutcome) {
        match outcome {
            TranscodeOutcome::Completed {
                frames_decoded,
                frames_written,
            } => {
                self.converted += 1;
                self.dropped_frames += frames_decoded.saturating_sub(*frames_written);
            }
            TranscodeOutcome::SourceUnavailable => self.source_unavailable += 1,
            TranscodeOutcome::DestinationUnavailable => self.destination_unavailable += 1,
            TranscodeOutcome::Failed => self.failed += 1,
        }
    }
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} videos finished: {} converted, {} unreadable, {} unwritable, {} failed",
            self.completed,
            self.total,
            self.converted,
            self.source_unavailable,
            self.destination_unavailable,
            self.failed
        )?;
        if self.dropped_frames > 0 {
            write!(f, ", {} frames dropped", self.dropped_frames)?;
        }
        Ok(())
    }
}

pub async fn run(config: &BatchConfig) -> anyhow::Result<BatchReport> {
    run_with(config, BatchProgress::new).await
}

pub async fn run_with(
    config: &BatchConfig,
    make_progress: impl FnOnce(u64) -> BatchProgress,
) -> anyhow::Result<BatchReport> {
    log::info!("video source directory: {}", config.source_dir().display());
    log::info!("output directory: {}", config.output_dir().display());
    log::info!("using {} workers", config.workers());

    let files = discovery::find_video_files(config.source_dir(), config.extensions())?;
    if files.is_empty() {
        log::warn!(
            "no supported video files found in {}",
            config.source_dir().display()
        );
        return Ok(BatchReport::default());
    }

    log::info!("found {} video files to process:", files.len());
    for file in &files {
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        log::info!(" - {}", name);
    }

    let output_dir = config.output_dir().to_path_buf();
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| anyhow::anyhow!("create output directory {}: {}", output_dir.display(), e))?;

    let total = files.len() as u64;
    let mut report = BatchReport {
        total,
        ..Default::default()
    };
    let mut progress = make_progress(total);

    let mut completions = futures::stream::iter(files)
        .map(|input| {
            let task = VideoTask::new(input, output_dir.clone());
            async move {
                let input = task.input().to_path_buf();
                let joined =
                    tokio::task::spawn_blocking(move || frame_transcoder::transcode_file(&task))
                        .await;
                (input, joined)
            }
        })
        .buffer_unordered(config.workers());

    while let Some((input, joined)) = completions.next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("worker for {} aborted: {}", input.display(), e);
                TranscodeOutcome::Failed
            }
        };
        log::debug!("{} finished: {:?}", input.display(), outcome);
        report.record(&outcome);
        progress.advance();
    }
    drop(completions);

    progress.finish();
    report.completed = progress.completed();

    log::info!("{}", report);
    log::info!("processed videos saved to: {}", output_dir.display());
    Ok(report)
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
