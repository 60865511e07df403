//! Stored video assets.

use serde::Serialize;
use std::path::PathBuf;

use crate::ids::VideoId;

/// A fully ingested, immutable video file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoAsset {
    pub id: VideoId,
    /// File name relative to the storage root.
    pub path: PathBuf,
    pub size_bytes: u64,
}
