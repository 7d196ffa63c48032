use crate::config::settings::AppConfig;
use crate::infrastructure::notify::Notifier;
use crate::modules::download::cache::DownloadCache;
use crate::modules::jobs::store::JobStore;
use crate::workers::encoder::EncodeQueue;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: JobStore,
    pub encode_queue: EncodeQueue,
    pub cache: Arc<DownloadCache>,
    pub notifier: Arc<dyn Notifier>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: JobStore,
        encode_queue: EncodeQueue,
        cache: Arc<DownloadCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            store,
            encode_queue,
            cache,
            notifier,
            started_at: Instant::now(),
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::infrastructure::notify::LogNotifier;
    use crate::modules::download::cache::SystemClock;
    use std::path::Path;
    use std::time::Duration;

    /// A fully wired state rooted at `data_dir`, with a live (but
    /// never-drained in most tests) encode channel.
    pub async fn state_with_data_dir(
        data_dir: &Path,
    ) -> (AppState, tokio::sync::mpsc::Receiver<crate::workers::encoder::EncodeTask>) {
        let config = AppConfig {
            server_port: 0,
            api_key: "test-key".to_string(),
            data_dir: data_dir.to_path_buf(),
            public_base_url: "http://localhost".to_string(),
        };
        let store = JobStore::new(config.videos_dir(), config.uploads_dir());
        store.init().await.unwrap();
        tokio::fs::create_dir_all(config.temp_dir()).await.unwrap();

        let (queue, rx) = crate::workers::encoder::encode_channel(8);
        let cache = Arc::new(DownloadCache::new(
            Duration::from_secs(60),
            Arc::new(SystemClock),
        ));
        let state = AppState::new(config, store, queue, cache, Arc::new(LogNotifier));
        (state, rx)
    }
}
