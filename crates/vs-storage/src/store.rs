//! Flat-file video store.
//!
//! Each asset lives in a single file `{id}.{extension}` directly under the
//! configured root. There is no index: existence and size come straight from
//! the filesystem. Writers are created with `create_new`, so two uploads can
//! never share a destination.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, ReadBuf, Take};

use vs_core::config::StorageConfig;
use vs_core::{Error, Result, VideoAsset, VideoId};

/// Suffix given to aborted uploads that are kept for inspection.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Filesystem-backed store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct VideoStore {
    root: PathBuf,
    extension: String,
}

impl VideoStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, extension: impl Into<String>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(Error::storage)?;
        tracing::debug!(root = %root.display(), "Video store opened");
        Ok(Self {
            root,
            extension: extension.into(),
        })
    }

    /// Open the store described by `config`.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::open(&config.root, config.extension.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name of `id` relative to the root.
    pub fn file_name(&self, id: &VideoId) -> String {
        format!("{}.{}", id, self.extension)
    }

    /// Absolute location of `id`.
    pub fn path_for(&self, id: &VideoId) -> PathBuf {
        self.root.join(self.file_name(id))
    }

    /// Whether an asset file exists for `id`.
    pub async fn exists(&self, id: &VideoId) -> Result<bool> {
        fs::try_exists(self.path_for(id)).await.map_err(Error::storage)
    }

    /// Size in bytes of the asset stored under `id`.
    pub async fn size(&self, id: &VideoId) -> Result<u64> {
        match fs::metadata(self.path_for(id)).await {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(Error::not_found("video", id)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::not_found("video", id)),
            Err(e) => Err(Error::storage(e)),
        }
    }

    /// Open a read cursor over the inclusive byte range `[start, end]`.
    pub async fn open_read(&self, id: &VideoId, start: u64, end: u64) -> Result<AssetReader> {
        let size = self.size(id).await?;
        if start > end || end >= size {
            return Err(Error::InvalidRange { start, end, size });
        }

        let mut file = File::open(self.path_for(id)).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::not_found("video", id)
            } else {
                Error::read(e)
            }
        })?;
        file.seek(SeekFrom::Start(start)).await.map_err(Error::read)?;

        let len = end - start + 1;
        tracing::trace!(video_id = %id, start, end, "Opened read cursor");
        Ok(AssetReader {
            inner: file.take(len),
            len,
        })
    }

    /// Create the file for `id` and return a sink for its bytes.
    ///
    /// Fails with [`Error::AlreadyExists`] when the identifier is taken. If
    /// the returned writer is dropped before [`AssetWriter::finish`], the
    /// partial file is deleted, or moved to a free [`PARTIAL_SUFFIX`] name
    /// when `keep_partial` is set. Cleanup runs on the blocking pool.
    pub async fn open_write(&self, id: &VideoId, keep_partial: bool) -> Result<AssetWriter> {
        let path = self.path_for(id);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => Error::AlreadyExists(id.to_string()),
                _ => Error::storage(e),
            })?;

        tracing::debug!(video_id = %id, path = %path.display(), "Opened write sink");
        Ok(AssetWriter {
            id: id.clone(),
            relative: PathBuf::from(self.file_name(id)),
            path,
            file: Some(file),
            bytes_written: 0,
            keep_partial,
            finished: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Read cursor
// ---------------------------------------------------------------------------

/// Read cursor limited to one byte window of an asset.
#[derive(Debug)]
pub struct AssetReader {
    inner: Take<File>,
    len: u64,
}

impl AssetReader {
    /// Number of bytes the cursor yields in total.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.len
    }
}

impl AsyncRead for AssetReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

// ---------------------------------------------------------------------------
// Write sink
// ---------------------------------------------------------------------------

/// Append-only sink for a new asset.
#[derive(Debug)]
pub struct AssetWriter {
    id: VideoId,
    path: PathBuf,
    relative: PathBuf,
    file: Option<File>,
    bytes_written: u64,
    keep_partial: bool,
    finished: bool,
}

impl AssetWriter {
    pub fn id(&self) -> &VideoId {
        &self.id
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append `buf` to the asset.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Internal("write after writer was released".into()))?;
        file.write_all(buf).await.map_err(Error::storage)?;
        // tokio hands writes to a blocking thread; wait for it so a later
        // discard sees every byte counted here.
        file.flush().await.map_err(Error::storage)?;
        self.bytes_written += buf.len() as u64;
        Ok(())
    }

    /// Flush and sync the file, returning the finished asset.
    pub async fn finish(mut self) -> Result<VideoAsset> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| Error::Internal("writer already released".into()))?;
        file.flush().await.map_err(Error::storage)?;
        file.sync_all().await.map_err(Error::storage)?;
        let size_bytes = file.metadata().await.map_err(Error::storage)?.len();
        drop(file);

        self.finished = true;
        tracing::info!(
            video_id = %self.id,
            size_bytes,
            "Asset stored"
        );
        Ok(VideoAsset {
            id: self.id.clone(),
            path: self.relative.clone(),
            size_bytes,
        })
    }

    /// Release the sink and discard the partial file, waiting until the
    /// cleanup has run on the blocking pool.
    pub async fn abort(mut self) {
        let Some(cleanup) = self.take_cleanup() else {
            return;
        };
        if let Err(e) = tokio::task::spawn_blocking(move || cleanup.run()).await {
            tracing::error!("Incomplete upload cleanup task failed: {e}");
        }
    }

    fn take_cleanup(&mut self) -> Option<PartialCleanup> {
        if self.finished {
            return None;
        }
        self.finished = true;
        drop(self.file.take());
        Some(PartialCleanup {
            id: self.id.clone(),
            path: self.path.clone(),
            bytes_written: self.bytes_written,
            keep_partial: self.keep_partial,
        })
    }
}

impl Drop for AssetWriter {
    fn drop(&mut self) {
        let Some(cleanup) = self.take_cleanup() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || cleanup.run());
            }
            Err(_) => cleanup.run(),
        }
    }
}

/// Removal (or preservation) of an unfinished asset file.
struct PartialCleanup {
    id: VideoId,
    path: PathBuf,
    bytes_written: u64,
    keep_partial: bool,
}

impl PartialCleanup {
    fn run(self) {
        let result = if self.keep_partial {
            preserve_partial(&self.path).map(Some)
        } else {
            std::fs::remove_file(&self.path).map(|()| None)
        };

        match result {
            Ok(kept) => tracing::warn!(
                video_id = %self.id,
                bytes_written = self.bytes_written,
                kept_as = ?kept,
                "Discarded incomplete upload"
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                video_id = %self.id,
                path = %self.path.display(),
                "Failed to clean up incomplete upload: {e}"
            ),
        }
    }
}

/// Upper bound on `.partial` copies kept for a single file name.
const MAX_PARTIAL_COPIES: usize = 1000;

/// Path of the `n`th preserved copy of `path`: `clip.mp4.partial`, then
/// `clip.mp4.1.partial`, `clip.mp4.2.partial` and so on.
fn partial_path(path: &Path, n: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    if n > 0 {
        name.push(format!(".{n}"));
    }
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Move `path` to the first free `.partial` name. Linking fails on an
/// existing target, so an earlier partial file is never replaced.
fn preserve_partial(path: &Path) -> io::Result<PathBuf> {
    for n in 0..MAX_PARTIAL_COPIES {
        let target = partial_path(path, n);
        match std::fs::hard_link(path, &target) {
            Ok(()) => {
                std::fs::remove_file(path)?;
                return Ok(target);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{MAX_PARTIAL_COPIES} partial copies of {} already exist", path.display()),
    ))
}
