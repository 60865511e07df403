//! Partial-content delivery of one byte window.
//!
//! The first read buffer of the window is pulled from disk before any header
//! is committed, so an unreadable asset still produces a clean 500. The rest
//! of the window is streamed through `ReaderStream` in buffers of
//! `read_buffer_bytes`, keeping memory bounded regardless of window size.
//! When the client goes away hyper drops the body and the read cursor with
//! it; nothing else needs cleaning up.

use std::io;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use vs_core::config::StreamingConfig;
use vs_core::{ByteWindow, Error, Result};
use vs_storage::AssetReader;

/// Build a 206 response streaming `window` out of `reader`.
pub async fn deliver(
    window: ByteWindow,
    mut reader: AssetReader,
    streaming: &StreamingConfig,
) -> Result<Response> {
    if reader.len() != window.len() {
        return Err(Error::Internal(format!(
            "read cursor covers {} bytes but window {window} needs {}",
            reader.len(),
            window.len()
        )));
    }

    let buffer = streaming.read_buffer_bytes.max(1);
    let first_len = window.len().min(buffer as u64) as usize;
    let mut first = BytesMut::zeroed(first_len);
    reader.read_exact(&mut first).await.map_err(Error::read)?;

    let head = stream::once(async move { Ok::<Bytes, io::Error>(first.freeze()) });
    let body = head
        .chain(ReaderStream::with_capacity(reader, buffer))
        .inspect_err(move |e| {
            tracing::warn!(
                start = window.start,
                end = window.end,
                "Storage read failed mid-delivery: {e}"
            );
        });

    tracing::debug!(
        start = window.start,
        end = window.end,
        total = window.total,
        "Delivering window"
    );

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, streaming.content_type.as_str())
        .header(header::CONTENT_RANGE, window.content_range())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, window.len().to_string())
        .body(Body::from_stream(body))
        .map_err(|e| Error::Internal(format!("failed to build response: {e}")))
}
