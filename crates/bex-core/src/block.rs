//! Content-addressed file blocks.

use sha2::{Digest, Sha256};

/// Fixed block size used when splitting upload sources (128 KiB).
pub const BLOCK_SIZE: usize = 128 * 1024;

/// One SHA-256-addressed slice of a file.
///
/// Blocks of a file are contiguous and offset-ascending; only the last
/// block may be shorter than [`BLOCK_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    /// Byte offset of the block within the file.
    pub offset: u64,
    /// Actual payload length.
    pub size: u32,
    /// SHA-256 of the payload.
    pub hash: [u8; 32],
}

impl BlockInfo {
    /// Hex rendering of the block hash, the identity key used throughout
    /// the engine.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Digest of a file's ordered block-hash list.
///
/// The per-block hex hashes are joined with `,` and the resulting ASCII
/// string is SHA-256 hashed. Used as the equality key between local state
/// and a remote's index echo.
pub fn hash_blocks(blocks: &[BlockInfo]) -> String {
    let joined = blocks
        .iter()
        .map(BlockInfo::hash_hex)
        .collect::<Vec<_>>()
        .join(",");
    hex::encode(Sha256::digest(joined.as_bytes()))
}
