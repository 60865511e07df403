//! Application configuration types.
//!
//! The top-level [`Config`] is deserialized from TOML by the binary. Every
//! section defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::range::DEFAULT_MAX_CHUNK_BYTES;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub streaming: StreamingConfig,
    pub ingest: IngestConfig,
}

impl Config {
    /// Reject settings the server cannot run with.
    pub fn check(&self) -> Result<()> {
        if self.streaming.max_chunk_bytes == 0 {
            return Err(Error::Internal(
                "streaming.max_chunk_bytes must be greater than 0".into(),
            ));
        }
        if self.streaming.read_buffer_bytes == 0 {
            return Err(Error::Internal(
                "streaming.read_buffer_bytes must be greater than 0".into(),
            ));
        }
        if self.storage.extension.is_empty()
            || !self
                .storage
                .extension
                .bytes()
                .all(|b| b.is_ascii_alphanumeric())
        {
            return Err(Error::Internal(format!(
                "storage.extension {:?} must be non-empty and alphanumeric",
                self.storage.extension
            )));
        }
        if self.ingest.max_pending_bytes < self.ingest.flush_threshold_bytes {
            return Err(Error::Internal(
                "ingest.max_pending_bytes must be at least ingest.flush_threshold_bytes".into(),
            ));
        }
        Ok(())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.streaming.read_buffer_bytes as u64 > self.streaming.max_chunk_bytes {
            warnings.push(format!(
                "streaming.read_buffer_bytes ({}) exceeds max_chunk_bytes ({}); reads will never fill the buffer",
                self.streaming.read_buffer_bytes, self.streaming.max_chunk_bytes
            ));
        }

        if self.ingest.naming_policy == NamingPolicy::ClientSupplied {
            warnings.push(
                "ingest.naming_policy is client_supplied; uploads reusing a file name will be rejected"
                    .into(),
            );
        }

        if self.ingest.keep_partial_uploads {
            warnings.push(
                "ingest.keep_partial_uploads is enabled; aborted uploads accumulate as .partial files"
                    .into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Flat file store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one file per asset.
    pub root: PathBuf,
    /// Extension appended to every identifier to form its file name.
    pub extension: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./videos"),
            extension: "mp4".into(),
        }
    }
}

/// Partial-content delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Largest window served by a single range response.
    pub max_chunk_bytes: u64,
    /// Size of each read from disk while streaming a window.
    pub read_buffer_bytes: usize,
    pub content_type: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            read_buffer_bytes: 64 * 1024,
            content_type: "video/mp4".into(),
        }
    }
}

/// How an upload's destination identifier is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    /// The server generates a random identifier.
    #[default]
    ServerGenerated,
    /// The file name sent by the client becomes the identifier.
    ClientSupplied,
}

/// Upload ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub naming_policy: NamingPolicy,
    /// Pending bytes that trigger a write to disk.
    pub flush_threshold_bytes: usize,
    /// Hard ceiling on bytes staged in memory for one upload.
    pub max_pending_bytes: usize,
    /// Keep aborted uploads as `<file>.partial` instead of deleting them.
    pub keep_partial_uploads: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            naming_policy: NamingPolicy::default(),
            flush_threshold_bytes: 256 * 1024,
            max_pending_bytes: 8 * 1024 * 1024,
            keep_partial_uploads: false,
        }
    }
}
