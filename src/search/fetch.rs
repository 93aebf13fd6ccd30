//! Shard transport: how raw shard bytes reach the runtime.
//!
//! The runtime is transport-agnostic; it asks a [`ShardFetcher`] for each
//! shard by name and never retries. Two transports are provided: HTTP for the
//! deployed site and the local filesystem for CLI queries and tests.

use std::future::Future;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::artifact::shard::ShardName;

/// Why a shard could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered, but not with the shard.
    #[error("shard {shard}: HTTP status {status}")]
    Status { shard: ShardName, status: u16 },
    /// The request never completed.
    #[error("shard {shard}: {message}")]
    Transport { shard: ShardName, message: String },
    /// Local read failed, including the file being absent.
    #[error("shard {shard}: {source}")]
    Io {
        shard: ShardName,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// The shard the failure is about.
    pub fn shard(&self) -> ShardName {
        match self {
            FetchError::Status { shard, .. }
            | FetchError::Transport { shard, .. }
            | FetchError::Io { shard, .. } => *shard,
        }
    }
}

/// Source of raw shard bytes.
///
/// Implementations must be safe to call concurrently; the runtime fetches the
/// whole shard set in parallel.
pub trait ShardFetcher: Send + Sync {
    /// Fetch the raw bytes of one shard.
    fn fetch(&self, shard: ShardName) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Fetch shards over HTTP from a published artifact directory.
#[derive(Debug, Clone)]
pub struct HttpShardFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpShardFetcher {
    /// `base_url` is the artifact directory URL, e.g. `https://example.org/search`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    fn shard_url(&self, shard: ShardName) -> String {
        format!("{}/{}", self.base_url, shard.file_name())
    }
}

impl ShardFetcher for HttpShardFetcher {
    async fn fetch(&self, shard: ShardName) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(self.shard_url(shard))
            .send()
            .await
            .map_err(|err| FetchError::Transport { shard, message: err.to_string() })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { shard, status: status.as_u16() });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport { shard, message: err.to_string() })?;
        Ok(bytes.to_vec())
    }
}

/// Fetch shards from a local artifact directory.
#[derive(Debug, Clone)]
pub struct FsShardFetcher {
    root: PathBuf,
}

impl FsShardFetcher {
    /// `root` is the artifact directory itself, e.g. `<site>/search`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ShardFetcher for FsShardFetcher {
    async fn fetch(&self, shard: ShardName) -> Result<Vec<u8>, FetchError> {
        tokio::fs::read(self.root.join(shard.file_name()))
            .await
            .map_err(|source| FetchError::Io { shard, source })
    }
}
