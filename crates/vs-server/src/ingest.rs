//! Streaming multipart ingestion.
//!
//! The request body is fed straight into a `multer` parser; the first file
//! part is copied to a new asset as its chunks arrive. Chunks are only pulled
//! from the network after the previous write completes, so a slow disk slows
//! the upload down instead of piling data up in memory. A small staging
//! buffer coalesces tiny network chunks into larger disk writes and is
//! bounded by `max_pending_bytes`.
//!
//! The asset is finalized only after the whole multipart body has been
//! consumed. Any failure before that point aborts the session and the
//! partial file is gone before the error is returned. If the request future
//! is dropped instead, the writer's drop guard cleans up in the background.

use bytes::{Bytes, BytesMut};
use futures::Stream;

use vs_core::config::{IngestConfig, NamingPolicy};
use vs_core::{Error, Result, VideoAsset, VideoId};
use vs_storage::{AssetWriter, VideoStore};

/// State of one upload between opening the sink and finalizing it.
pub struct IngestionSession {
    writer: AssetWriter,
    pending: BytesMut,
    flush_threshold: usize,
    max_pending: usize,
}

impl IngestionSession {
    /// Open a write sink for `id`.
    pub async fn begin(store: &VideoStore, id: &VideoId, config: &IngestConfig) -> Result<Self> {
        let writer = store.open_write(id, config.keep_partial_uploads).await?;
        Ok(Self {
            writer,
            pending: BytesMut::with_capacity(config.flush_threshold_bytes),
            flush_threshold: config.flush_threshold_bytes,
            max_pending: config.max_pending_bytes,
        })
    }

    pub fn destination(&self) -> &VideoId {
        self.writer.id()
    }

    /// Bytes accepted so far, written or staged.
    pub fn bytes_received(&self) -> u64 {
        self.writer.bytes_written() + self.pending.len() as u64
    }

    /// Accept the next chunk of the file part.
    ///
    /// Once staged plus incoming bytes reach the flush threshold, the staged
    /// bytes are written and the chunk follows directly; only bytes that stay
    /// staged count against `max_pending_bytes`.
    pub async fn push(&mut self, chunk: &[u8]) -> Result<()> {
        if self.pending.len() + chunk.len() >= self.flush_threshold {
            self.flush().await?;
            return self.writer.write_all(chunk).await;
        }

        let pending = self.pending.len() + chunk.len();
        if pending > self.max_pending {
            return Err(Error::BackpressureOverflow {
                pending,
                limit: self.max_pending,
            });
        }
        self.pending.extend_from_slice(chunk);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.writer.write_all(&self.pending).await?;
        self.pending.clear();
        Ok(())
    }

    /// Write out staged bytes and durably close the asset.
    pub async fn complete(mut self) -> Result<VideoAsset> {
        self.flush().await?;
        self.writer.finish().await
    }

    /// Release the sink and discard everything written so far.
    pub async fn abort(self) {
        self.writer.abort().await;
    }
}

/// Ingest a `multipart/form-data` body, storing its first file part.
pub async fn ingest<S, E>(
    store: &VideoStore,
    config: &IngestConfig,
    content_type: Option<&str>,
    body: S,
) -> Result<VideoAsset>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let content_type =
        content_type.ok_or_else(|| Error::MalformedUpload("missing Content-Type header".into()))?;
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| Error::MalformedUpload(format!("{content_type:?}: {e}")))?;

    let mut multipart = multer::Multipart::new(body, boundary);
    let mut session: Option<IngestionSession> = None;

    let ignored_files = match receive_parts(store, config, &mut multipart, &mut session).await {
        Ok(ignored) => ignored,
        Err(e) => {
            if let Some(session) = session {
                session.abort().await;
            }
            return Err(e);
        }
    };

    let session = session.ok_or(Error::NoFilePart)?;
    let received = session.bytes_received();
    let asset = session.complete().await?;
    debug_assert_eq!(received, asset.size_bytes);
    tracing::info!(
        video_id = %asset.id,
        size_bytes = asset.size_bytes,
        ignored_files,
        "Upload complete"
    );
    Ok(asset)
}

/// Walk every part of the body, streaming the first file part into `session`.
///
/// Returns the number of additional file parts that were drained.
async fn receive_parts(
    store: &VideoStore,
    config: &IngestConfig,
    multipart: &mut multer::Multipart<'_>,
    session: &mut Option<IngestionSession>,
) -> Result<usize> {
    let mut ignored_files = 0usize;

    while let Some(mut field) = multipart.next_field().await.map_err(upload_error)? {
        let file_name = field.file_name().map(str::to_owned);
        match file_name {
            Some(name) if session.is_none() => {
                let id = destination_id(config.naming_policy, &name, store.extension())?;
                tracing::info!(
                    video_id = %id,
                    field = field.name().unwrap_or(""),
                    "Receiving upload"
                );
                let current = session.insert(IngestionSession::begin(store, &id, config).await?);
                while let Some(chunk) = field.chunk().await.map_err(upload_error)? {
                    current.push(&chunk).await?;
                }
            }
            Some(name) => {
                ignored_files += 1;
                tracing::debug!(file_name = %name, "Ignoring additional file part");
                drain(&mut field).await?;
            }
            None => drain(&mut field).await?,
        }
    }

    Ok(ignored_files)
}

/// Pick the identifier an upload is stored under.
///
/// With [`NamingPolicy::ClientSupplied`] the file name becomes the
/// identifier, minus the store's extension if the name carries it.
pub fn destination_id(policy: NamingPolicy, file_name: &str, extension: &str) -> Result<VideoId> {
    match policy {
        NamingPolicy::ServerGenerated => VideoId::generate(),
        NamingPolicy::ClientSupplied => {
            let stem = match file_name.rsplit_once('.') {
                Some((stem, ext)) if ext.eq_ignore_ascii_case(extension) => stem,
                _ => file_name,
            };
            if stem.is_empty() {
                return Err(Error::MalformedUpload(
                    "file part has no usable file name".into(),
                ));
            }
            VideoId::parse(stem)
        }
    }
}

async fn drain(field: &mut multer::Field<'_>) -> Result<()> {
    while field.chunk().await.map_err(upload_error)?.is_some() {}
    Ok(())
}

fn upload_error(e: multer::Error) -> Error {
    match e {
        multer::Error::StreamReadFailed(source) => {
            Error::MalformedUpload(format!("upload stream interrupted: {source}"))
        }
        other => Error::MalformedUpload(other.to_string()),
    }
}
