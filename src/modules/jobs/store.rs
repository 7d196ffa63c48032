use crate::common::error::AppError;
use crate::modules::jobs::model::Job;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

const RECORD_FILE: &str = "stats.json";

/// Filesystem-backed job store: one directory per job id under the videos
/// root, each holding the encoded output and a single `stats.json` record.
/// The single source of truth for status and stats.
#[derive(Clone)]
pub struct JobStore {
    videos_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl JobStore {
    pub fn new(videos_dir: PathBuf, uploads_dir: PathBuf) -> Self {
        Self {
            videos_dir,
            uploads_dir,
        }
    }

    pub async fn init(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.videos_dir).await?;
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        Ok(())
    }

    pub fn videos_dir(&self) -> &PathBuf {
        &self.videos_dir
    }

    pub fn uploads_dir(&self) -> &PathBuf {
        &self.uploads_dir
    }

    pub fn job_dir(&self, id: &Uuid) -> PathBuf {
        self.videos_dir.join(id.to_string())
    }

    pub fn record_path(&self, id: &Uuid) -> PathBuf {
        self.job_dir(id).join(RECORD_FILE)
    }

    pub fn output_path(&self, id: &Uuid, output_filename: &str) -> PathBuf {
        self.job_dir(id).join(output_filename)
    }

    /// Create the job directory, exclusively. Ids are drawn from a space
    /// large enough that a collision means misconfiguration, so it is
    /// surfaced as a storage error rather than silently overwritten.
    pub async fn create_job_dir(&self, id: &Uuid) -> Result<PathBuf, AppError> {
        let dir = self.job_dir(id);
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(AppError::Storage(format!(
                "job directory collision for id {id}"
            ))),
            Err(e) => Err(AppError::Storage(e.to_string())),
        }
    }

    /// Persist the full record, all-or-nothing: serialize in memory, write a
    /// sibling temp file, rename over any previous record.
    pub async fn write_record(&self, job: &Job) -> Result<(), AppError> {
        let body = serde_json::to_vec(job).map_err(|e| AppError::Storage(e.to_string()))?;
        let final_path = self.record_path(&job.id);
        let tmp_path = self.job_dir(&job.id).join(format!("{RECORD_FILE}.tmp"));
        tokio::fs::write(&tmp_path, &body).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    /// Load the record for a job. Missing and unparsable records both read
    /// as absent; an unparsable record is additionally logged.
    pub async fn load_record(&self, id: &Uuid) -> Result<Option<Job>, AppError> {
        let path = self.record_path(id);
        let data = match tokio::fs::read(&path).await {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Storage(e.to_string())),
        };
        match serde_json::from_slice::<Job>(&data) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                warn!("unparsable record for job {}: {}", id, e);
                Ok(None)
            }
        }
    }

    pub async fn remove_job_dir(&self, id: &Uuid) -> std::io::Result<()> {
        tokio::fs::remove_dir_all(self.job_dir(id)).await
    }
}
