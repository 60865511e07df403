//! vidstream - partial-content video streaming and streamed uploads.
//!
//! The library target exposes configuration loading for the binary and the
//! integration tests; the HTTP surface lives in `vs-server`.

pub mod config;
