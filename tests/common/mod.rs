//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which owns a temporary storage root, a config
//! pointing at it and the resulting [`AppContext`]. The [`with_server`]
//! constructor starts the server on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use vs_core::config::Config;
use vs_server::context::AppContext;

/// File name the harness uploads under unless a test picks one.
pub const DEFAULT_FILE_NAME: &str = "clip.mp4";

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// temporary directory.
pub struct TestHarness {
    pub ctx: AppContext,
    dir: TempDir,
    cancel: CancellationToken,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration. The storage root is
    /// always replaced with a fresh temporary directory.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.storage.root = dir.path().join("videos");
        let ctx = AppContext::new(config).expect("failed to build context");
        Self {
            ctx,
            dir,
            cancel: CancellationToken::new(),
        }
    }

    /// Start the server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start the server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let ctx = harness.ctx.clone();
        let cancel = harness.cancel.clone();
        tokio::spawn(async move {
            vs_server::serve(listener, ctx, cancel).await.ok();
        });

        (harness, addr)
    }

    /// Directory the store writes into.
    pub fn storage_root(&self) -> PathBuf {
        self.ctx.store.root().to_path_buf()
    }

    /// Names of every file currently in the storage root, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.storage_root())
            .expect("failed to read storage root")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Write an asset straight into the storage root, bypassing the upload
    /// path.
    pub fn seed(&self, id: &str, data: &[u8]) {
        let path = self.storage_root().join(format!("{id}.mp4"));
        std::fs::write(path, data).expect("failed to seed asset");
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Deterministic, non-repeating-looking payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Upload `data` as the single file part of a multipart form.
pub async fn upload(addr: SocketAddr, file_name: &str, data: Vec<u8>) -> reqwest::Response {
    let part = reqwest::multipart::Part::bytes(data)
        .file_name(file_name.to_string())
        .mime_str("video/mp4")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    reqwest::Client::new()
        .post(format!("http://{addr}/videos"))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

/// Upload `data` and return the identifier the server assigned.
pub async fn upload_ok(addr: SocketAddr, data: Vec<u8>) -> String {
    let len = data.len() as u64;
    let resp = upload(addr, DEFAULT_FILE_NAME, data).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["size_bytes"], len);
    json["id"].as_str().unwrap().to_string()
}

/// Issue `GET /videos?videoId={id}` with an optional `Range` header.
pub async fn get_range(addr: SocketAddr, id: &str, range: Option<&str>) -> reqwest::Response {
    let mut req = reqwest::Client::new().get(format!("http://{addr}/videos"));
    req = req.query(&[("videoId", id)]);
    if let Some(range) = range {
        req = req.header("range", range);
    }
    req.send().await.unwrap()
}

pub fn header<'a>(resp: &'a reqwest::Response, name: &str) -> &'a str {
    resp.headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}
