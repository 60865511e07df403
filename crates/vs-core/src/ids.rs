//! Opaque video identifiers.
//!
//! A [`VideoId`] names exactly one stored asset. Generated identifiers carry
//! 128 bits of OS entropy encoded with the URL-safe base64 alphabet. Any
//! identifier, generated or client-supplied, goes through [`VideoId::parse`]
//! so it can never name a path outside the storage root.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of random bytes behind a generated identifier.
pub const ID_ENTROPY_BYTES: usize = 16;

/// Longest identifier accepted from callers.
pub const MAX_ID_LEN: usize = 128;

/// Identifier of a stored video asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Generate a fresh identifier from the operating system's entropy source.
    ///
    /// Entropy failures are returned as [`Error::Internal`] and never retried.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; ID_ENTROPY_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::Internal(format!("entropy source failed: {e}")))?;
        Ok(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Validate a caller-supplied identifier.
    ///
    /// Accepts ASCII letters, digits, `-`, `_` and `.`; rejects empty values,
    /// values longer than [`MAX_ID_LEN`], a leading dot and any `..`.
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::InvalidIdentifier("identifier is empty".into()));
        }
        if value.len() > MAX_ID_LEN {
            return Err(Error::InvalidIdentifier(format!(
                "identifier longer than {MAX_ID_LEN} characters"
            )));
        }
        if value.starts_with('.') || value.contains("..") {
            return Err(Error::InvalidIdentifier(value.to_string()));
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        {
            return Err(Error::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VideoId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VideoId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
