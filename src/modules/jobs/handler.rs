use crate::common::error::AppError;
use crate::common::upload::{StagedUpload, stage_video_field};
use crate::modules::jobs::dto::{HealthResponse, JobDescriptor, JobStatusResponse};
use crate::modules::jobs::model::now_unix_ms;
use crate::modules::jobs::service::JobService;
use crate::state::AppState;
use crate::workers::encoder::EncodeTask;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use sysinfo::System;
use tracing::error;
use uuid::Uuid;

/// Submit a video for size-targeted compression.
///
/// Without an `email` field the request blocks until the encode reaches a
/// terminal state and the response carries final stats. With one, the
/// response returns immediately with ratio-derived estimates and the encode
/// continues on the background worker.
#[utoipa::path(
    post,
    path = "/process-video",
    responses(
        (status = 200, description = "Job accepted", body = JobDescriptor),
        (status = 400, description = "Invalid submission"),
        (status = 401, description = "Invalid API key"),
        (status = 500, description = "Encode or storage failure")
    ),
    tag = "Jobs",
    security(("bearer_auth" = []))
)]
pub async fn process_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut staged: Option<StagedUpload> = None;
    let mut target_raw: Option<String> = None;
    let mut notify_email: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard_if_staged(&staged).await;
                return Err(AppError::Validation(format!("Invalid multipart payload: {e}")));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                if staged.is_some() {
                    discard_if_staged(&staged).await;
                    return Err(AppError::Validation(
                        "Only one video file is accepted per submission".to_string(),
                    ));
                }
                match stage_video_field(field, state.store.uploads_dir()).await {
                    Ok(upload) => staged = Some(upload),
                    Err(e) => return Err(e),
                }
            }
            "targetSize" => {
                target_raw = field.text().await.ok();
            }
            "email" => {
                notify_email = field.text().await.ok().filter(|s| !s.trim().is_empty());
            }
            _ => {}
        }
    }

    let Some(staged) = staged else {
        return Err(AppError::Validation("No file uploaded".to_string()));
    };

    let target_size_mb = match target_raw {
        None => {
            staged.discard().await;
            return Err(AppError::Validation("Target size is required".to_string()));
        }
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(mb) if mb.is_finite() && mb > 0.0 => mb,
            _ => {
                staged.discard().await;
                return Err(AppError::Validation(
                    "Target size must be a positive number of megabytes".to_string(),
                ));
            }
        },
    };

    match notify_email {
        // Fire-and-continue: respond with estimates, encode on the worker.
        Some(email) => {
            let prepared =
                JobService::prepare(&state, staged, target_size_mb, Some(email)).await?;
            let (estimated_new_size, estimated_reduction) =
                JobService::estimates(&prepared.job, target_size_mb);
            let descriptor =
                JobDescriptor::from_estimate(&prepared.job, estimated_new_size, estimated_reduction);

            if let Err(task) = state.encode_queue.submit(EncodeTask { prepared }).await {
                error!("encode queue rejected job {}", task.prepared.job.id);
                JobService::fail_prepared(&state, task.prepared).await;
                return Err(AppError::Storage("encode worker unavailable".to_string()));
            }

            Ok(Json(descriptor).into_response())
        }
        // Synchronous: block until the terminal state.
        None => {
            let prepared = JobService::prepare(&state, staged, target_size_mb, None).await?;
            let job = JobService::encode(&state, prepared).await?;
            Ok(Json(JobDescriptor::from_final(&job)).into_response())
        }
    }
}

async fn discard_if_staged(staged: &Option<StagedUpload>) {
    if let Some(upload) = staged {
        upload.discard().await;
    }
}

/// Current record for a job, with the expiry projection applied. Expired
/// and unknown ids are both 404.
#[utoipa::path(
    get,
    path = "/status/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job record", body = JobStatusResponse),
        (status = 401, description = "Invalid API key"),
        (status = 404, description = "Unknown or expired job")
    ),
    tag = "Jobs",
    security(("bearer_auth" = []))
)]
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let job = state
        .store
        .load_record(&id)
        .await?
        .ok_or(AppError::NotFound)?;

    let now = now_unix_ms();
    if job.is_expired_at(now) {
        return Err(AppError::NotFound);
    }

    Ok(Json(JobStatusResponse::from_job(&job, now)))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Process liveness", body = HealthResponse)),
    tag = "Jobs"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut sys = System::new();
    sys.refresh_memory();

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        memory_used_bytes: sys.used_memory(),
        memory_total_bytes: sys.total_memory(),
    })
}

#[cfg(test)]
mod tests {
    use crate::app::create_app;
    use crate::modules::jobs::model::{JOB_TTL_MS, Job, JobStatus, now_unix_ms};
    use crate::state::test_support::state_with_data_dir;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn status_request(id: &Uuid, api_key: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/status/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn seed_job(state: &crate::state::AppState, created_at: i64) -> Job {
        let mut job = Job::new(
            Uuid::new_v4(),
            "clip.mov".to_string(),
            "clip-rsize.mp4".to_string(),
            1_000_000,
            None,
        );
        job.created_at = created_at;
        job.status = JobStatus::Completed;
        job.new_size = Some(500_000);
        state.store.create_job_dir(&job.id).await.unwrap();
        state.store.write_record(&job).await.unwrap();
        job
    }

    #[tokio::test]
    async fn status_requires_a_valid_api_key() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _rx) = state_with_data_dir(tmp.path()).await;
        let app = create_app(state);

        let response = app
            .oneshot(status_request(&Uuid::new_v4(), "wrong-key"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn status_of_unknown_job_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _rx) = state_with_data_dir(tmp.path()).await;
        let app = create_app(state);

        let response = app
            .oneshot(status_request(&Uuid::new_v4(), "test-key"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_of_live_job_reports_record_and_expiry() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _rx) = state_with_data_dir(tmp.path()).await;
        let job = seed_job(&state, now_unix_ms()).await;
        let app = create_app(state);

        let response = app.oneshot(status_request(&job.id, "test-key")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["newSize"], 500_000);
        assert!(json["expiresInSeconds"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn status_of_expired_job_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _rx) = state_with_data_dir(tmp.path()).await;
        let job = seed_job(&state, now_unix_ms() - JOB_TTL_MS - 1_000).await;
        let app = create_app(state);

        let response = app.oneshot(status_request(&job.id, "test-key")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_open_and_reports_memory() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _rx) = state_with_data_dir(tmp.path()).await;
        let app = create_app(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["memoryTotalBytes"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn submission_without_a_file_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _rx) = state_with_data_dir(tmp.path()).await;
        let app = create_app(state);

        let boundary = "----test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"targetSize\"\r\n\r\n25\r\n--{boundary}--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process-video")
                    .header(header::AUTHORIZATION, "Bearer test-key")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn submission_with_bad_target_size_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _rx) = state_with_data_dir(tmp.path()).await;
        let uploads_dir = state.store.uploads_dir().clone();
        let app = create_app(state);

        let boundary = "----test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"video\"; filename=\"clip.mov\"\r\n\
             Content-Type: video/quicktime\r\n\r\n\
             fake video bytes\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"targetSize\"\r\n\r\n\
             -5\r\n\
             --{boundary}--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process-video")
                    .header(header::AUTHORIZATION, "Bearer test-key")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // The staged copy must not be left behind after the rejection.
        let mut entries = tokio::fs::read_dir(&uploads_dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
