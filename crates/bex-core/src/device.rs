//! Device identity and its version-counter projection.
//!
//! Version counters identify devices by a u64 projection of their full
//! identity:
//! ```text
//! short_id = big_endian_u64(sha256(device id bytes)[..8])
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A peer's binary device identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(Vec<u8>);

impl DeviceId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Projects the identity to the u64 used as a version-counter id.
    ///
    /// Big-endian read of the first 8 bytes of the identity's SHA-256,
    /// matching what existing peers put on the wire.
    pub fn short_id(&self) -> u64 {
        let digest = Sha256::digest(&self.0);
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_known_vector() {
        // SHA-256("abc") = ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad
        let id = DeviceId::new(b"abc".to_vec());
        assert_eq!(id.short_id(), 0xba7816bf8f01cfea);
    }

    #[test]
    fn test_short_id_deterministic() {
        let id = DeviceId::new(vec![7u8; 32]);
        assert_eq!(id.short_id(), id.short_id());
    }

    #[test]
    fn test_short_id_distinguishes_devices() {
        let a = DeviceId::new(vec![1u8; 32]);
        let b = DeviceId::new(vec![2u8; 32]);
        assert_ne!(a.short_id(), b.short_id());
    }
}
