//! Unified error type for vidstream.
//!
//! Every failure on the delivery and ingestion paths funnels into [`Error`],
//! which carries enough context for HTTP handlers to derive a status code via
//! [`Error::http_status`].

/// Unified error type covering range resolution, storage and upload failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request carried no `Range` header; playback always uses partial content.
    #[error("Missing Range header")]
    MissingRange,

    /// The `Range` header could not be parsed into a start offset.
    #[error("Malformed Range header: {0}")]
    MalformedRange(String),

    /// The asset exists but holds zero bytes, so no window can be served.
    #[error("Asset is empty")]
    EmptyAsset,

    /// The requested start offset lies at or beyond the end of the asset.
    #[error("Range start {start} not satisfiable for asset of {total} bytes")]
    UnsatisfiableRange {
        /// Requested start offset.
        start: u64,
        /// Total asset size in bytes.
        total: u64,
    },

    /// A read cursor was requested for a window outside the asset.
    #[error("Invalid byte range {start}-{end} for asset of {size} bytes")]
    InvalidRange {
        /// First byte of the requested window.
        start: u64,
        /// Last byte (inclusive) of the requested window.
        end: u64,
        /// Actual size of the asset.
        size: u64,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "video").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The identifier is empty, too long, or would escape the storage root.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A file already occupies the path derived from this identifier.
    #[error("Asset already exists: {0}")]
    AlreadyExists(String),

    /// The upload is not a well-formed multipart body.
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    /// The multipart body finished without any file part.
    #[error("Upload contained no file part")]
    NoFilePart,

    /// The filesystem refused an operation (disk full, permission denied, ...).
    #[error("Storage unavailable: {source}")]
    StorageUnavailable {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading asset bytes failed.
    #[error("Storage read error: {source}")]
    StorageReadError {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Incoming upload data outran the bounded staging buffer.
    #[error("Upload buffer overflow: {pending} bytes pending exceeds limit of {limit}")]
    BackpressureOverflow {
        /// Bytes that would have been pending after accepting the chunk.
        pending: usize,
        /// Configured ceiling.
        limit: usize,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::MissingRange => 400,
            Error::MalformedRange(_) => 400,
            Error::EmptyAsset => 416,
            Error::UnsatisfiableRange { .. } => 416,
            Error::InvalidRange { .. } => 416,
            Error::NotFound { .. } => 404,
            Error::InvalidIdentifier(_) => 400,
            Error::AlreadyExists(_) => 409,
            Error::MalformedUpload(_) => 400,
            Error::NoFilePart => 400,
            Error::StorageUnavailable { .. } => 500,
            Error::StorageReadError { .. } => 500,
            Error::BackpressureOverflow { .. } => 503,
            Error::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingRange => "missing_range",
            Error::MalformedRange(_) => "malformed_range",
            Error::EmptyAsset => "empty_asset",
            Error::UnsatisfiableRange { .. } => "unsatisfiable_range",
            Error::InvalidRange { .. } => "invalid_range",
            Error::NotFound { .. } => "not_found",
            Error::InvalidIdentifier(_) => "invalid_identifier",
            Error::AlreadyExists(_) => "already_exists",
            Error::MalformedUpload(_) => "malformed_upload",
            Error::NoFilePart => "no_file_part",
            Error::StorageUnavailable { .. } => "storage_unavailable",
            Error::StorageReadError { .. } => "storage_read_error",
            Error::BackpressureOverflow { .. } => "backpressure_overflow",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Whether the failure was caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }

    /// Total asset size to advertise in `Content-Range: bytes */{total}`, if known.
    pub fn unsatisfied_total(&self) -> Option<u64> {
        match self {
            Error::UnsatisfiableRange { total, .. } => Some(*total),
            Error::InvalidRange { size, .. } => Some(*size),
            Error::EmptyAsset => Some(0),
            _ => None,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::StorageUnavailable`].
    pub fn storage(source: std::io::Error) -> Self {
        Error::StorageUnavailable { source }
    }

    /// Convenience constructor for [`Error::StorageReadError`].
    pub fn read(source: std::io::Error) -> Self {
        Error::StorageReadError { source }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
