use crate::common::error::AppError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Format-level metadata from ffprobe's JSON output.
#[derive(Debug, Clone, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

/// The two source facts bitrate planning needs.
#[derive(Debug, Clone, Copy)]
pub struct SourceInfo {
    pub duration_seconds: f64,
    pub size_bytes: u64,
}

/// Probe an uploaded file with `ffprobe -print_format json -show_format`.
///
/// A probe failure means the upload is not a usable video, which is a
/// validation outcome, not an encoder fault.
pub async fn probe_source(path: &Path) -> Result<SourceInfo, AppError> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await
        .map_err(|e| AppError::Storage(format!("failed to execute ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("ffprobe failed for {:?}: {}", path, stderr.trim());
        return Err(AppError::Validation(
            "Supplied file is not in a recognised video format".to_string(),
        ));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&json).map_err(|e| {
        debug!("ffprobe parse failure for {:?}: {}", path, e);
        AppError::Validation("Supplied file is not in a recognised video format".to_string())
    })
}

fn parse_probe_output(json: &str) -> Result<SourceInfo> {
    let parsed: ProbeOutput = serde_json::from_str(json).context("invalid ffprobe JSON")?;

    let duration_seconds = parsed
        .format
        .duration
        .as_deref()
        .context("ffprobe reported no duration")?
        .parse::<f64>()
        .context("ffprobe duration is not numeric")?;

    let size_bytes = parsed
        .format
        .size
        .as_deref()
        .context("ffprobe reported no size")?
        .parse::<u64>()
        .context("ffprobe size is not numeric")?;

    Ok(SourceInfo {
        duration_seconds,
        size_bytes,
    })
}
