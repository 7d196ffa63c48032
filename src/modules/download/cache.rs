use crate::modules::jobs::model::Job;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Time source for cache aging. Tests swap in a manual clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Outcome of resolving a download path against the store. Bodies are always
/// streamed from disk; only the record lookup is cached.
#[derive(Clone)]
pub enum DownloadLookup {
    Missing,
    Found { job: Job, file_size: u64 },
}

pub struct DownloadCache {
    entries: Mutex<HashMap<String, (DownloadLookup, Instant)>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl DownloadCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub async fn get(&self, key: &str) -> Option<DownloadLookup> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((lookup, inserted_at)) if self.clock.now() - *inserted_at < self.ttl => {
                Some(lookup.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, key: String, lookup: DownloadLookup) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, inserted_at)| now - *inserted_at < self.ttl);
        entries.insert(key, (lookup, now));
    }
}
