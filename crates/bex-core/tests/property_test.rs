//! Property-based tests for bex-core.
//!
//! Tests invariants using proptest:
//! - Block partition arithmetic
//! - Content-hash definition
//! - Version vector construction
//! - Split-then-reassemble round trips

use bex_core::{extend_version, hash_blocks, Counter, DataSource, BLOCK_SIZE};
use proptest::prelude::*;
use sha2::{Digest, Sha256};

/// Deterministic payload; cheap to generate compared to a proptest vec.
fn patterned(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i % 251) as u8 ^ seed)
        .collect()
}

fn counters(pairs: &[(u64, u64)]) -> Vec<Counter> {
    pairs
        .iter()
        .map(|&(id, value)| Counter { id, value })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // ========================================================================
    // Block Partition Invariants
    // ========================================================================

    /// Property: blocks are contiguous, offset-ascending, sized within
    /// BLOCK_SIZE, and only the last block may be short.
    #[test]
    fn prop_block_partition_arithmetic(
        len in 0usize..(3 * BLOCK_SIZE + 1),
        seed in any::<u8>(),
    ) {
        let source = DataSource::from_bytes(patterned(len, seed));
        let blocks = source.blocks().expect("blocks").to_vec();

        let total: u64 = blocks.iter().map(|b| u64::from(b.size)).sum();
        prop_assert_eq!(total, len as u64);
        prop_assert_eq!(source.size().expect("size"), len as u64);

        let mut expected_offset = 0u64;
        for (i, block) in blocks.iter().enumerate() {
            prop_assert_eq!(block.offset, expected_offset);
            prop_assert!(block.size as usize <= BLOCK_SIZE);
            prop_assert!(block.size > 0);
            if i + 1 < blocks.len() {
                prop_assert_eq!(block.size as usize, BLOCK_SIZE);
            }
            expected_offset += u64::from(block.size);
        }
    }

    /// Property: content_hash is the SHA-256 of the comma-joined hex
    /// block-hash list.
    #[test]
    fn prop_content_hash_definition(
        len in 0usize..(2 * BLOCK_SIZE + 7),
        seed in any::<u8>(),
    ) {
        let source = DataSource::from_bytes(patterned(len, seed));
        let blocks = source.blocks().expect("blocks");

        let joined = blocks
            .iter()
            .map(|b| b.hash_hex())
            .collect::<Vec<_>>()
            .join(",");
        let expected = hex::encode(Sha256::digest(joined.as_bytes()));

        prop_assert_eq!(source.content_hash().expect("content hash"), &expected);
        prop_assert_eq!(hash_blocks(blocks), expected);
    }

    /// Property: reading every announced block back in order reproduces the
    /// original bytes.
    #[test]
    fn prop_split_then_reassemble(
        len in 0usize..(2 * BLOCK_SIZE + 7),
        seed in any::<u8>(),
    ) {
        let data = patterned(len, seed);
        let source = DataSource::from_bytes(data.clone());
        let blocks = source.blocks().expect("blocks").to_vec();

        let mut reassembled = Vec::with_capacity(len);
        for block in &blocks {
            let bytes = source
                .block(block.offset, block.size as usize, &block.hash_hex())
                .expect("block read");
            reassembled.extend_from_slice(&bytes);
        }
        prop_assert_eq!(reassembled, data);
    }

    // ========================================================================
    // Version Vector Invariants
    // ========================================================================

    /// Property: extend_version(V, id, s) == V ++ [Counter(id, s)],
    /// elementwise, for any prior vector.
    #[test]
    fn prop_version_builder_appends(
        prev in prop::collection::vec((any::<u64>(), any::<u64>()), 0..8),
        device in any::<u64>(),
        sequence in any::<u64>(),
    ) {
        let prev = counters(&prev);
        let built = extend_version(&prev, device, sequence);

        prop_assert_eq!(built.len(), prev.len() + 1);
        prop_assert_eq!(&built[..prev.len()], &prev[..]);
        prop_assert_eq!(built[prev.len()], Counter { id: device, value: sequence });
    }
}
