use crate::modules::jobs::model::{Job, JobStatus, format_unix_ms};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Submission response: final stats in synchronous mode, estimates in
/// fire-and-continue mode.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub id: Uuid,
    pub output_filename: String,
    pub expires_at: String,
    pub original_size: u64,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_new_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_reduction_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_duration_seconds: Option<f64>,
    pub download_path: String,
}

impl JobDescriptor {
    pub fn from_final(job: &Job) -> Self {
        Self {
            id: job.id,
            output_filename: job.output_filename.clone(),
            expires_at: format_unix_ms(job.expires_at_ms()),
            original_size: job.original_size,
            status: job.status,
            new_size: job.new_size,
            estimated_new_size: None,
            reduction_percentage: job.reduction_percentage,
            estimated_reduction_percentage: None,
            compression_duration_seconds: job.compression_duration_seconds,
            download_path: job.download_path(),
        }
    }

    pub fn from_estimate(
        job: &Job,
        estimated_new_size: u64,
        estimated_reduction_percentage: f64,
    ) -> Self {
        Self {
            id: job.id,
            output_filename: job.output_filename.clone(),
            expires_at: format_unix_ms(job.expires_at_ms()),
            original_size: job.original_size,
            status: job.status,
            new_size: None,
            estimated_new_size: Some(estimated_new_size),
            reduction_percentage: None,
            estimated_reduction_percentage: Some(estimated_reduction_percentage),
            compression_duration_seconds: None,
            download_path: job.download_path(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub id: Uuid,
    pub status: JobStatus,
    pub created_at: i64,
    pub expires_at: String,
    /// Shrinks monotonically between reads of an unchanged job.
    pub expires_in_seconds: i64,
    pub original_filename: String,
    pub output_filename: String,
    pub original_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_duration_seconds: Option<f64>,
    pub download_path: String,
}

impl JobStatusResponse {
    pub fn from_job(job: &Job, now_ms: i64) -> Self {
        Self {
            id: job.id,
            status: job.status_at(now_ms),
            created_at: job.created_at,
            expires_at: format_unix_ms(job.expires_at_ms()),
            expires_in_seconds: job.expires_in_seconds(now_ms),
            original_filename: job.original_filename.clone(),
            output_filename: job.output_filename.clone(),
            original_size: job.original_size,
            new_size: job.new_size,
            reduction_percentage: job.reduction_percentage,
            compression_duration_seconds: job.compression_duration_seconds,
            download_path: job.download_path(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
}
