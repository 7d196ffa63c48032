use crate::modules::jobs::service::{JobService, PreparedJob};
use crate::state::AppState;
use tokio::sync::mpsc;
use tracing::{error, info};

pub struct EncodeTask {
    pub prepared: PreparedJob,
}

/// Submission side of the encode worker channel.
#[derive(Clone)]
pub struct EncodeQueue {
    tx: mpsc::Sender<EncodeTask>,
}

impl EncodeQueue {
    /// Hands the task back when the worker is gone or the queue is full.
    pub async fn submit(&self, task: EncodeTask) -> Result<(), EncodeTask> {
        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(task) => task,
            mpsc::error::TrySendError::Closed(task) => task,
        })
    }
}

pub fn encode_channel(capacity: usize) -> (EncodeQueue, mpsc::Receiver<EncodeTask>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EncodeQueue { tx }, rx)
}

/// Drains the queue one job at a time. ffmpeg already saturates the machine
/// with `-threads 0`, so encodes are deliberately not run concurrently.
pub async fn run_encode_worker(state: AppState, mut rx: mpsc::Receiver<EncodeTask>) {
    info!("encode worker started");
    while let Some(task) = rx.recv().await {
        let id = task.prepared.job.id;
        match JobService::encode(&state, task.prepared).await {
            Ok(job) => info!(
                "background encode of job {} completed ({} bytes)",
                id,
                job.new_size.unwrap_or(0)
            ),
            Err(e) => error!("background encode of job {} failed: {}", id, e),
        }
    }
    info!("encode worker stopped");
}
