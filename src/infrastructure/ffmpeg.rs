use crate::common::error::AppError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// Fixed audio track bitrate for the final pass.
const AUDIO_BITRATE: &str = "128k";

/// Suffixes x264 appends to the `-passlogfile` base path.
const PASS_LOG_SUFFIXES: [&str; 2] = ["-0.log", "-0.log.mbtree"];

/// Everything one two-pass encode needs. The pass-log base path is unique
/// per job so concurrent encodes never share analysis state.
#[derive(Debug, Clone)]
pub struct EncodePlan {
    pub input: PathBuf,
    pub output: PathBuf,
    pub video_bitrate: u64,
    pub pass_log: PathBuf,
}

/// Removes the pass-log artifacts when dropped, so cleanup runs on every
/// exit path out of the encode pipeline.
struct PassLogGuard {
    base: PathBuf,
}

impl Drop for PassLogGuard {
    fn drop(&mut self) {
        for suffix in PASS_LOG_SUFFIXES {
            let mut path = self.base.as_os_str().to_owned();
            path.push(suffix);
            let path = PathBuf::from(path);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove pass log {:?}: {}", path, e),
            }
        }
    }
}

/// Run the two-pass encode: an analysis pass into a null sink, then the
/// output pass with audio and faststart metadata placement. A pass-1
/// failure aborts before pass 2; no pass is ever retried. Pass-log
/// artifacts are removed on success and on every failure path, and a failed
/// encode never leaves a partial output file behind.
pub async fn encode_two_pass(plan: &EncodePlan) -> Result<(), AppError> {
    let _guard = PassLogGuard {
        base: plan.pass_log.clone(),
    };

    let result = run_passes(plan).await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&plan.output).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove partial output {:?}: {}", plan.output, e);
            }
        }
    }
    result
}

async fn run_passes(plan: &EncodePlan) -> Result<(), AppError> {
    info!(
        "starting pass 1 for {:?} at {} bps",
        plan.input, plan.video_bitrate
    );
    run_ffmpeg(pass1_args(plan), "ffmpeg pass 1").await?;

    info!("starting pass 2 for {:?} -> {:?}", plan.input, plan.output);
    run_ffmpeg(pass2_args(plan), "ffmpeg pass 2").await?;

    Ok(())
}

async fn run_ffmpeg(args: Vec<String>, descriptor: &str) -> Result<(), AppError> {
    let output = Command::new("ffmpeg")
        .args(&args)
        .output()
        .await
        .map_err(|e| AppError::Encode(format!("failed to execute ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // The tail is where ffmpeg puts the actual failure reason.
        let tail: String = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(AppError::Encode(format!("{descriptor} failed: {tail}")));
    }

    Ok(())
}

fn common_args(plan: &EncodePlan) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        path_arg(&plan.input),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "ultrafast".to_string(),
        "-b:v".to_string(),
        plan.video_bitrate.to_string(),
        "-passlogfile".to_string(),
        path_arg(&plan.pass_log),
        "-threads".to_string(),
        "0".to_string(),
        "-profile:v".to_string(),
        "baseline".to_string(),
        "-level".to_string(),
        "3.0".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ]
}

fn pass1_args(plan: &EncodePlan) -> Vec<String> {
    let mut args = common_args(plan);
    args.extend(
        ["-pass", "1", "-an", "-f", "null", "/dev/null"]
            .iter()
            .map(|s| s.to_string()),
    );
    args
}

fn pass2_args(plan: &EncodePlan) -> Vec<String> {
    let mut args = common_args(plan);
    args.extend(
        ["-pass", "2", "-c:a", "aac", "-b:a", AUDIO_BITRATE, "-movflags", "+faststart"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(path_arg(&plan.output));
    args
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> EncodePlan {
        EncodePlan {
            input: PathBuf::from("/data/uploads/in.mov"),
            output: PathBuf::from("/data/videos/abc/in-rsize.mp4"),
            video_bitrate: 3_367_253,
            pass_log: PathBuf::from("/data/temp/ffmpeg2pass-abc"),
        }
    }

    #[test]
    fn pass1_discards_output_and_audio() {
        let args = pass1_args(&plan());
        let joined = args.join(" ");
        assert!(joined.contains("-pass 1"));
        assert!(joined.contains("-an"));
        assert!(joined.ends_with("-f null /dev/null"));
        assert!(!joined.contains("in-rsize.mp4"));
    }

    #[test]
    fn pass2_writes_output_with_audio_and_faststart() {
        let args = pass2_args(&plan());
        let joined = args.join(" ");
        assert!(joined.contains("-pass 2"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-b:a 128k"));
        assert!(joined.contains("-movflags +faststart"));
        assert!(joined.ends_with("in-rsize.mp4"));
    }

    #[test]
    fn passes_share_the_analysis_log() {
        let p = plan();
        let one = pass1_args(&p).join(" ");
        let two = pass2_args(&p).join(" ");
        assert!(one.contains("-passlogfile /data/temp/ffmpeg2pass-abc"));
        assert!(two.contains("-passlogfile /data/temp/ffmpeg2pass-abc"));
    }

    #[test]
    fn pass_log_guard_removes_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("ffmpeg2pass-test");
        let log = tmp.path().join("ffmpeg2pass-test-0.log");
        let mbtree = tmp.path().join("ffmpeg2pass-test-0.log.mbtree");
        std::fs::write(&log, b"stats").unwrap();
        std::fs::write(&mbtree, b"tree").unwrap();

        drop(PassLogGuard { base });

        assert!(!log.exists());
        assert!(!mbtree.exists());
    }

    #[test]
    fn pass_log_guard_tolerates_missing_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        drop(PassLogGuard {
            base: tmp.path().join("never-created"),
        });
    }
}
