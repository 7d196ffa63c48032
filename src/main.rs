use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod middleware;
mod modules;
mod routes;
mod state;
mod workers;

use crate::config::settings::AppConfig;
use crate::infrastructure::notify::LogNotifier;
use crate::modules::download::cache::{DownloadCache, SystemClock};
use crate::modules::jobs::store::JobStore;
use crate::state::AppState;

const DOWNLOAD_CACHE_TTL: Duration = Duration::from_secs(60);
const ENCODE_QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt::init();

    info!("Starting server...");

    let config = AppConfig::new().expect("API_KEY must be set");

    let store = JobStore::new(config.videos_dir(), config.uploads_dir());
    store.init().await.expect("failed to create data directories");
    tokio::fs::create_dir_all(config.temp_dir())
        .await
        .expect("failed to create temp directory");

    let (encode_queue, encode_rx) = workers::encoder::encode_channel(ENCODE_QUEUE_CAPACITY);
    let cache = Arc::new(DownloadCache::new(DOWNLOAD_CACHE_TTL, Arc::new(SystemClock)));

    let state = AppState::new(config, store.clone(), encode_queue, cache, Arc::new(LogNotifier));

    tokio::spawn(workers::encoder::run_encode_worker(state.clone(), encode_rx));
    tokio::spawn(workers::reaper::run_reaper(store));

    let addr = format!("0.0.0.0:{}", state.config.server_port);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("Server running on http://{addr}");

    axum::serve(listener, app).await.unwrap();
}
