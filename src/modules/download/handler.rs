use crate::common::error::AppError;
use crate::modules::download::cache::DownloadLookup;
use crate::modules::jobs::model::{Job, JobStatus, now_unix_ms};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum_extra::TypedHeader;
use axum_extra::headers::Range;
use axum_range::{KnownSize, Ranged};
use tokio::fs::File;
use tracing::warn;
use uuid::Uuid;

/// Stream an encoded output, honoring HTTP range requests. Anything that
/// does not resolve to a live, completed job with a matching filename is a
/// uniform 404.
#[utoipa::path(
    get,
    path = "/download/{id}/{filename}",
    params(
        ("id" = Uuid, Path, description = "Job ID"),
        ("filename" = String, Path, description = "Encoded output filename")
    ),
    responses(
        (status = 200, description = "Full file body"),
        (status = 206, description = "Requested byte range"),
        (status = 404, description = "Unknown, incomplete or expired job")
    ),
    tag = "Download"
)]
pub async fn download(
    State(state): State<AppState>,
    Path((id, filename)): Path<(Uuid, String)>,
    range: Option<TypedHeader<Range>>,
) -> Result<Response, AppError> {
    let key = format!("/download/{id}/{filename}");

    let lookup = match state.cache.get(&key).await {
        Some(cached) => cached,
        None => {
            let resolved = resolve(&state, &id, &filename).await?;
            state.cache.put(key, resolved.clone()).await;
            resolved
        }
    };

    let (job, file_size) = match lookup {
        DownloadLookup::Missing => return Err(AppError::NotFound),
        DownloadLookup::Found { job, file_size } => (job, file_size),
    };

    let now = now_unix_ms();
    if job.is_expired_at(now) {
        // Expired jobs vanish; reclamation happens off the request path.
        let store = state.store.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            if let Err(e) = store.remove_job_dir(&job_id).await {
                warn!("failed to remove expired job {}: {}", job_id, e);
            }
        });
        return Err(AppError::NotFound);
    }

    let path = state.store.output_path(&job.id, &job.output_filename);
    let file = File::open(&path).await.map_err(|_| AppError::NotFound)?;
    let body = KnownSize::sized(file, file_size);
    let ranged = Ranged::new(range.map(|TypedHeader(r)| r), body);

    Ok((download_headers(&job, now), ranged).into_response())
}

/// One store round-trip per cacheable decision. Only a completed job whose
/// output filename matches the requested one, with the output actually on
/// disk, is downloadable.
async fn resolve(state: &AppState, id: &Uuid, filename: &str) -> Result<DownloadLookup, AppError> {
    let Some(job) = state.store.load_record(id).await? else {
        return Ok(DownloadLookup::Missing);
    };

    if job.status != JobStatus::Completed || job.output_filename != filename {
        return Ok(DownloadLookup::Missing);
    }

    let path = state.store.output_path(&job.id, &job.output_filename);
    match tokio::fs::metadata(&path).await {
        Ok(meta) => Ok(DownloadLookup::Found {
            file_size: meta.len(),
            job,
        }),
        Err(_) => Ok(DownloadLookup::Missing),
    }
}

fn download_headers(job: &Job, now_ms: i64) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let mime = mime_guess::from_path(&job.output_filename).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }

    let disposition = format!("attachment; filename=\"{}\"", job.output_filename);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    let remaining = job.expires_in_seconds(now_ms);
    let expires_in = format!("{}h {}m", remaining / 3600, (remaining % 3600) / 60);
    if let Ok(value) = HeaderValue::from_str(&expires_in) {
        headers.insert("x-expires-in", value);
    }

    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    headers
}
