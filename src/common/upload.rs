use crate::common::error::AppError;
use axum::extract::multipart::Field;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};
use uuid::Uuid;

/// A raw upload written to the staging area, not yet owned by any job.
#[derive(Debug)]
pub struct StagedUpload {
    pub path: PathBuf,
    pub original_filename: String,
    pub size: u64,
}

impl StagedUpload {
    /// Remove the staged file. Failures are logged, never raised: the reaper
    /// sweeps anything left behind.
    pub async fn discard(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!("failed to remove staged upload {:?}: {}", self.path, e);
        }
    }
}

/// Stream one multipart `video` field onto disk in the staging area.
///
/// Rejects non-video content types before writing anything. On a stream or
/// write error the partial file is unlinked before the error is returned.
pub async fn stage_video_field(
    mut field: Field<'_>,
    uploads_dir: &Path,
) -> Result<StagedUpload, AppError> {
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    if !content_type.starts_with("video/") {
        return Err(AppError::Validation(
            "Only video files are allowed".to_string(),
        ));
    }

    let original_filename = field
        .file_name()
        .map(|n| n.to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    let staged_name = match Path::new(&original_filename)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    };
    let path = uploads_dir.join(staged_name);

    let mut file = File::create(&path).await?;
    let mut size: u64 = 0;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("upload stream error: {}", e);
                abort_staging(&mut file, &path).await;
                return Err(AppError::Validation("Upload stream interrupted".to_string()));
            }
        };

        if let Err(e) = file.write_all(&chunk).await {
            error!("upload write error: {}", e);
            abort_staging(&mut file, &path).await;
            return Err(AppError::Storage(e.to_string()));
        }
        size += chunk.len() as u64;
    }

    file.flush().await?;

    Ok(StagedUpload {
        path,
        original_filename,
        size,
    })
}

async fn abort_staging(file: &mut File, path: &Path) {
    let _ = file.shutdown().await;
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("failed to remove partial upload {:?}: {}", path, e);
    }
}
