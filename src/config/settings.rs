use crate::config::env::{self, EnvKey};
use std::path::PathBuf;

/// Upload cap. One file per submission, at most 4 GiB.
pub const MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub api_key: String,
    pub data_dir: PathBuf,
    pub public_base_url: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 5000),
            api_key: env::get(EnvKey::ApiKey)?,
            data_dir: PathBuf::from(env::get_or(EnvKey::DataDir, "data")),
            public_base_url: env::get_or(EnvKey::PublicBaseUrl, "http://localhost:5000"),
        })
    }

    /// One directory per job id, each holding the encoded output and its record.
    pub fn videos_dir(&self) -> PathBuf {
        self.data_dir.join("videos")
    }

    /// Staging area for raw uploads awaiting (or undergoing) an encode.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Scratch space for two-pass analysis logs.
    pub fn temp_dir(&self) -> PathBuf {
        self.data_dir.join("temp")
    }
}
