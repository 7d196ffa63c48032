use crate::modules::jobs::model::{JOB_TTL_MS, now_unix_ms};
use crate::modules::jobs::store::JobStore;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

const SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Periodic reclamation of expired jobs and abandoned uploads. The first
/// sweep runs at startup so a restart never leaves stale data around for a
/// full interval.
pub async fn run_reaper(store: JobStore) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        sweep(&store, now_unix_ms()).await;
    }
}

pub async fn sweep(store: &JobStore, now_ms: i64) {
    sweep_job_dirs(store, now_ms).await;
    sweep_uploads(store, now_ms).await;
}

/// Removes job directories whose record is past its TTL. Directories with
/// no readable record are only removed once they are well past any
/// plausible lifetime, so a job mid-creation is never swept out from under
/// its writer.
async fn sweep_job_dirs(store: &JobStore, now_ms: i64) {
    let mut entries = match fs::read_dir(store.videos_dir()).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("reaper cannot read videos dir: {}", e);
            return;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(id) = name.to_str().and_then(|s| Uuid::parse_str(s).ok()) else {
            continue;
        };

        let expired = match store.load_record(&id).await {
            Ok(Some(job)) => job.is_expired_at(now_ms),
            Ok(None) => fs_age_exceeds(&entry.path(), now_ms, 2 * JOB_TTL_MS).await,
            Err(e) => {
                warn!("reaper cannot read record for job {}: {}", id, e);
                continue;
            }
        };

        if expired {
            match store.remove_job_dir(&id).await {
                Ok(()) => info!("reaped expired job {}", id),
                Err(e) => warn!("failed to reap job {}: {}", id, e),
            }
        }
    }
}

/// Staged uploads persist only while a request or encode is in flight;
/// anything older than a full TTL was abandoned.
async fn sweep_uploads(store: &JobStore, now_ms: i64) {
    let mut entries = match fs::read_dir(store.uploads_dir()).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("reaper cannot read uploads dir: {}", e);
            return;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        if fs_age_exceeds(&entry.path(), now_ms, JOB_TTL_MS).await {
            match fs::remove_file(entry.path()).await {
                Ok(()) => info!("reaped abandoned upload {:?}", entry.file_name()),
                Err(e) => warn!("failed to reap upload {:?}: {}", entry.file_name(), e),
            }
        }
    }
}

async fn fs_age_exceeds(path: &Path, now_ms: i64, limit_ms: i64) -> bool {
    let Ok(meta) = fs::metadata(path).await else {
        return false;
    };
    let stamp = meta.created().or_else(|_| meta.modified());
    let Ok(stamp) = stamp else {
        return false;
    };
    let Ok(since_epoch) = stamp.duration_since(SystemTime::UNIX_EPOCH) else {
        return false;
    };
    now_ms - since_epoch.as_millis() as i64 > limit_ms
}
