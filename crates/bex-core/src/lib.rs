//! Core data model for the bex block-exchange engine.
//!
//! Domain types shared by every layer of a bex peer: content-addressed
//! blocks, announced file records, version vectors, device identity
//! projection, sequence allocation and the restartable upload sources
//! that back block reads. Wire encoding and the push engine itself live
//! in `bex-push`.

pub mod block;
pub mod config;
pub mod device;
pub mod ordering;
pub mod record;
pub mod sequence;
pub mod source;
pub mod version;

mod error;

pub use block::{hash_blocks, BlockInfo, BLOCK_SIZE};
pub use config::DeviceConfig;
pub use device::DeviceId;
pub use error::Error;
pub use record::{FileRecord, FileType};
pub use sequence::{AtomicSequencer, Sequencer};
pub use source::{DataSource, SystemTempFiles, TempFileProvider};
pub use version::{extend_version, Counter};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
