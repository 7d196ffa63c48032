use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

/// Everything the mail (or any other) transport needs to tell a user their
/// video is ready.
#[derive(Debug, Clone)]
pub struct CompressionNotice {
    pub recipient: String,
    pub job_id: Uuid,
    pub output_filename: String,
    pub original_size: u64,
    pub new_size: u64,
    pub reduction_percentage: f64,
    pub download_url: String,
}

/// Outbound notification boundary. Dispatch is fire-and-forget and
/// at-most-once: a failure is logged by the caller and never changes the
/// job's terminal status.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &CompressionNotice) -> anyhow::Result<()>;
}

/// Default transport: logs the would-be message. Real mail delivery is an
/// external collaborator wired in at startup.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &CompressionNotice) -> anyhow::Result<()> {
        info!(
            "notification for {}: job {} reduced {} -> {} bytes ({:.2}%), download at {}",
            notice.recipient,
            notice.job_id,
            notice.original_size,
            notice.new_size,
            notice.reduction_percentage,
            notice.download_url
        );
        Ok(())
    }
}
