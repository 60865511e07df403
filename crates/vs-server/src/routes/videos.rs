//! Video playback and upload handlers.
//!
//! `GET /videos?videoId={id}` serves one fixed-size window per request and
//! requires a `Range: bytes=<offset>-` header. `POST /videos` takes a
//! `multipart/form-data` body and stores its first file part.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use vs_core::{range, Error, VideoId};

use crate::context::AppContext;
use crate::delivery;
use crate::error::AppError;
use crate::ingest;
use crate::middleware::request_id::RequestId;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
    pub size_bytes: u64,
}

/// GET /videos?videoId={id}
pub async fn stream_video(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    serve_window(&ctx, &query.video_id, &headers)
        .await
        .map_err(|e| AppError::new(e).with_request_id(request_id.0))
}

async fn serve_window(
    ctx: &AppContext,
    video_id: &str,
    headers: &HeaderMap,
) -> vs_core::Result<Response> {
    let range_header = headers
        .get(header::RANGE)
        .map(|v| {
            v.to_str()
                .map_err(|_| Error::MalformedRange("Range header is not ASCII".into()))
        })
        .transpose()?;
    let start = range::parse_range_start(range_header)?;

    let id = VideoId::parse(video_id)?;
    let total = ctx.store.size(&id).await?;
    let window = range::window_from_start(start, total, ctx.config.streaming.max_chunk_bytes)?;

    let reader = ctx.store.open_read(&id, window.start, window.end).await?;
    delivery::deliver(window, reader, &ctx.config.streaming).await
}

/// POST /videos
pub async fn upload_video(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UploadResponse>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let asset = ingest::ingest(
        &ctx.store,
        &ctx.config.ingest,
        content_type,
        body.into_data_stream(),
    )
    .await
    .map_err(|e| AppError::new(e).with_request_id(request_id.0))?;

    Ok(Json(UploadResponse {
        id: asset.id.to_string(),
        size_bytes: asset.size_bytes,
    }))
}
