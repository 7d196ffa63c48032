use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use utoipa::ToSchema;
use uuid::Uuid;

/// Retention window. No job may have its TTL individually extended.
pub const JOB_TTL_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Encoding,
    Completed,
    Failed,
    /// Derived at read time, never written to a record.
    Expired,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The per-job metadata record, persisted as `stats.json` in the job
/// directory. `status` is an explicit stored field, updated at every
/// transition; it is never inferred from which files happen to exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    /// Unix milliseconds, set at job-directory creation, immutable.
    pub created_at: i64,
    pub original_filename: String,
    pub output_filename: String,
    pub original_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,
}

impl Job {
    pub fn new(
        id: Uuid,
        original_filename: String,
        output_filename: String,
        original_size: u64,
        notify_email: Option<String>,
    ) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            created_at: now_unix_ms(),
            original_filename,
            output_filename,
            original_size,
            new_size: None,
            reduction_percentage: None,
            compression_duration_seconds: None,
            notify_email,
        }
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.created_at + JOB_TTL_MS
    }

    /// Strictly past the retention window.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms - self.created_at > JOB_TTL_MS
    }

    /// Stored status with the expiry projection applied.
    pub fn status_at(&self, now_ms: i64) -> JobStatus {
        if self.is_expired_at(now_ms) {
            JobStatus::Expired
        } else {
            self.status
        }
    }

    pub fn expires_in_seconds(&self, now_ms: i64) -> i64 {
        (self.expires_at_ms() - now_ms).max(0) / 1000
    }

    pub fn download_path(&self) -> String {
        format!("/download/{}/{}", self.id, self.output_filename)
    }
}

/// Output name derived deterministically from the upload's stem.
pub fn derive_output_filename(original_filename: &str) -> String {
    let stem = std::path::Path::new(original_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("video");
    format!("{stem}-rsize.mp4")
}

pub fn now_unix_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn format_unix_ms(ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| ms.to_string())
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_created_at(created_at: i64) -> Job {
        let mut job = Job::new(
            Uuid::new_v4(),
            "clip.mov".to_string(),
            "clip-rsize.mp4".to_string(),
            1_000_000,
            None,
        );
        job.created_at = created_at;
        job
    }

    #[test]
    fn expiry_is_strictly_past_ttl() {
        let job = job_created_at(0);
        assert!(!job.is_expired_at(JOB_TTL_MS));
        assert!(job.is_expired_at(JOB_TTL_MS + 1));
    }

    #[test]
    fn status_projection_overrides_stored_status() {
        let mut job = job_created_at(0);
        job.status = JobStatus::Completed;
        assert_eq!(job.status_at(JOB_TTL_MS), JobStatus::Completed);
        assert_eq!(job.status_at(JOB_TTL_MS + 1), JobStatus::Expired);
    }

    #[test]
    fn expires_in_shrinks_and_clamps_at_zero() {
        let job = job_created_at(0);
        let earlier = job.expires_in_seconds(1_000);
        let later = job.expires_in_seconds(60_000);
        assert!(later < earlier);
        assert_eq!(job.expires_in_seconds(JOB_TTL_MS + 5_000), 0);
    }

    #[test]
    fn output_filename_derivation() {
        assert_eq!(derive_output_filename("holiday.mov"), "holiday-rsize.mp4");
        assert_eq!(derive_output_filename("archive.tar.gz"), "archive.tar-rsize.mp4");
        assert_eq!(derive_output_filename(""), "video-rsize.mp4");
    }

    #[test]
    fn record_serializes_camel_case_and_skips_absent_stats() {
        let job = job_created_at(42);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["createdAt"], 42);
        assert!(json.get("newSize").is_none());
        assert!(json.get("notifyEmail").is_none());
    }
}
