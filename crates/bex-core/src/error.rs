//! Error types for core data operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("source ended {missing} bytes short of offset {offset}")]
    ShortSeek { offset: u64, missing: u64 },

    #[error("short read at offset {offset}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        offset: u64,
        wanted: usize,
        got: usize,
    },

    #[error("block hash mismatch at offset {offset}: expected {expected}, computed {computed}")]
    HashMismatch {
        offset: u64,
        expected: String,
        computed: String,
    },
}
