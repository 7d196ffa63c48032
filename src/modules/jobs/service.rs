use crate::common::error::AppError;
use crate::common::upload::StagedUpload;
use crate::infrastructure::ffmpeg::{self, EncodePlan};
use crate::infrastructure::ffprobe;
use crate::infrastructure::notify::CompressionNotice;
use crate::modules::jobs::model::{Job, JobStatus, derive_output_filename, round2};
use crate::modules::jobs::planner;
use crate::state::AppState;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A validated submission that owns its job directory and staged input,
/// ready for the encode pipeline (inline or on the background worker).
pub struct PreparedJob {
    pub job: Job,
    pub input_path: PathBuf,
    pub video_bitrate: u64,
}

pub struct JobService;

impl JobService {
    /// Validate a submission and create its job. Probes the source, plans
    /// the bitrate, then creates the job directory and writes the PENDING
    /// record. On any failure the staged upload is deleted and no job
    /// directory survives, so validation leaves no trace behind.
    pub async fn prepare(
        state: &AppState,
        staged: StagedUpload,
        target_size_mb: f64,
        notify_email: Option<String>,
    ) -> Result<PreparedJob, AppError> {
        let result = Self::prepare_inner(state, &staged, target_size_mb, notify_email).await;
        if result.is_err() {
            staged.discard().await;
        }
        result
    }

    async fn prepare_inner(
        state: &AppState,
        staged: &StagedUpload,
        target_size_mb: f64,
        notify_email: Option<String>,
    ) -> Result<PreparedJob, AppError> {
        let info = ffprobe::probe_source(&staged.path).await?;
        let original_size = if info.size_bytes > 0 {
            info.size_bytes
        } else {
            staged.size
        };

        let video_bitrate =
            planner::plan_video_bitrate(info.duration_seconds, original_size, target_size_mb)?;

        let id = Uuid::new_v4();
        state.store.create_job_dir(&id).await?;

        let job = Job::new(
            id,
            staged.original_filename.clone(),
            derive_output_filename(&staged.original_filename),
            original_size,
            notify_email,
        );

        if let Err(e) = state.store.write_record(&job).await {
            if let Err(rm) = state.store.remove_job_dir(&id).await {
                warn!("failed to remove job dir after record failure: {}", rm);
            }
            return Err(e);
        }

        info!(
            "job {} created: {:?} ({} bytes) -> {} at {} bps",
            id, staged.original_filename, original_size, job.output_filename, video_bitrate
        );

        Ok(PreparedJob {
            job,
            input_path: staged.path.clone(),
            video_bitrate,
        })
    }

    /// Drive the encode to a terminal state. The record transitions to
    /// ENCODING before the first pass, the terminal record is written
    /// strictly after the encode outcome is known, and the staged input is
    /// removed strictly after that, success or failure.
    pub async fn encode(state: &AppState, prepared: PreparedJob) -> Result<Job, AppError> {
        let PreparedJob {
            mut job,
            input_path,
            video_bitrate,
        } = prepared;

        let output_path = state.store.output_path(&job.id, &job.output_filename);
        let plan = EncodePlan {
            input: input_path.clone(),
            output: output_path.clone(),
            video_bitrate,
            pass_log: state
                .config
                .temp_dir()
                .join(format!("ffmpeg2pass-{}", job.id)),
        };

        job.status = JobStatus::Encoding;
        if let Err(e) = state.store.write_record(&job).await {
            remove_input(&input_path).await;
            return Err(e);
        }

        let started = Instant::now();
        let outcome = ffmpeg::encode_two_pass(&plan).await;

        match outcome {
            Ok(()) => {
                let new_size = match tokio::fs::metadata(&output_path).await {
                    Ok(m) => m.len(),
                    Err(e) => {
                        let err = AppError::Encode(format!("encoded output missing: {e}"));
                        Self::finalize_failure(state, &mut job, &input_path).await;
                        return Err(err);
                    }
                };

                job.status = JobStatus::Completed;
                job.new_size = Some(new_size);
                job.reduction_percentage = Some(round2(
                    (job.original_size.saturating_sub(new_size)) as f64 / job.original_size as f64
                        * 100.0,
                ));
                job.compression_duration_seconds = Some(round2(started.elapsed().as_secs_f64()));

                state.store.write_record(&job).await?;
                remove_input(&input_path).await;

                info!(
                    "job {} completed: {} -> {} bytes in {:.2}s",
                    job.id,
                    job.original_size,
                    new_size,
                    started.elapsed().as_secs_f64()
                );

                if job.notify_email.is_some() {
                    Self::dispatch_notification(state, &job).await;
                }

                Ok(job)
            }
            Err(e) => {
                Self::finalize_failure(state, &mut job, &input_path).await;
                Err(e)
            }
        }
    }

    /// Mark a prepared job FAILED without running the encode. Used when the
    /// background queue cannot accept the task.
    pub async fn fail_prepared(state: &AppState, prepared: PreparedJob) {
        let PreparedJob {
            mut job,
            input_path,
            ..
        } = prepared;
        Self::finalize_failure(state, &mut job, &input_path).await;
    }

    async fn finalize_failure(state: &AppState, job: &mut Job, input_path: &PathBuf) {
        job.status = JobStatus::Failed;
        job.new_size = None;
        if let Err(e) = state.store.write_record(job).await {
            error!("failed to write FAILED record for job {}: {}", job.id, e);
        }
        remove_input(input_path).await;
    }

    /// Ratio-derived estimate returned before a fire-and-continue encode.
    pub fn estimates(job: &Job, target_size_mb: f64) -> (u64, f64) {
        let target_bytes = target_size_mb * 1024.0 * 1024.0;
        let ratio = target_bytes / job.original_size as f64;
        let estimated_new_size = (job.original_size as f64 * ratio) as u64;
        let estimated_reduction = round2(100.0 - ratio * 100.0);
        (estimated_new_size, estimated_reduction)
    }

    /// At-most-once, fire-and-forget: failure is logged and never changes
    /// the job's terminal status.
    async fn dispatch_notification(state: &AppState, job: &Job) {
        let (Some(recipient), Some(new_size), Some(reduction)) = (
            job.notify_email.clone(),
            job.new_size,
            job.reduction_percentage,
        ) else {
            return;
        };

        let notice = CompressionNotice {
            recipient,
            job_id: job.id,
            output_filename: job.output_filename.clone(),
            original_size: job.original_size,
            new_size,
            reduction_percentage: reduction,
            download_url: format!("{}{}", state.config.public_base_url, job.download_path()),
        };

        if let Err(e) = state.notifier.notify(&notice).await {
            warn!("notification dispatch failed for job {}: {}", job.id, e);
        }
    }
}

async fn remove_input(input_path: &PathBuf) {
    if let Err(e) = tokio::fs::remove_file(input_path).await {
        warn!("failed to remove input file {:?}: {}", input_path, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_follow_the_target_ratio() {
        let job = Job::new(
            Uuid::new_v4(),
            "big.mov".to_string(),
            "big-rsize.mp4".to_string(),
            100 * 1024 * 1024,
            None,
        );
        let (new_size, reduction) = JobService::estimates(&job, 25.0);
        assert_eq!(new_size, 25 * 1024 * 1024);
        assert_eq!(reduction, 75.0);
    }
}
