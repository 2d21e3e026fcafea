//! Error types for the push engine.

use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("channel does not share folder {0}")]
    FolderNotShared(String),

    #[error("previous record is for {actual_folder}/{actual_name}, not {folder}/{name}")]
    RecordMismatch {
        folder: String,
        name: String,
        actual_folder: String,
        actual_name: String,
    },

    #[error("source: {0}")]
    Source(#[from] bex_core::Error),

    #[error("wire write failed: {0}")]
    Write(String),

    #[error("invalid record on wire: {0}")]
    InvalidRecord(String),

    #[error("upload worker failed: {0}")]
    Worker(String),

    #[error("channel closed")]
    ChannelClosed,

    /// A failure captured earlier in the upload, surfaced on every wait
    /// until the observer is released.
    #[error("upload failed: {0}")]
    Upload(Arc<Error>),
}
