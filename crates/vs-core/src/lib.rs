//! vs-core: shared identifiers, errors, range resolution and configuration.
//!
//! This crate is the foundational dependency for the other vs-* crates. It
//! performs no I/O apart from reading the operating system entropy source
//! when generating identifiers.

pub mod asset;
pub mod config;
pub mod error;
pub mod ids;
pub mod range;

// Re-export the most commonly used items at the crate root.
pub use asset::VideoAsset;
pub use error::{Error, Result};
pub use ids::VideoId;
pub use range::ByteWindow;
