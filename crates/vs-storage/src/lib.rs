//! vs-storage: the flat-file asset store behind delivery and ingestion.

pub mod store;

pub use store::{AssetReader, AssetWriter, VideoStore, PARTIAL_SUFFIX};
