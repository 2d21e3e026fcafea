//! Deterministic payloads and records for tests.

use bex_core::{Counter, DeviceConfig, DeviceId, FileRecord, FileType};

/// Bytes with a 251-byte period, cheap to regenerate and unlikely to
/// produce accidentally equal blocks.
pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// A fixed-width device identity derived from a seed byte.
pub fn test_device_id(seed: u8) -> DeviceId {
    DeviceId::new(vec![seed; 32])
}

pub fn test_config(seed: u8) -> DeviceConfig {
    DeviceConfig::new(test_device_id(seed))
}

/// A prior file record with the given `(id, value)` version counters, the
/// shape handed to delete and re-announce operations.
pub fn prior_file_record(folder: &str, name: &str, counters: &[(u64, u64)]) -> FileRecord {
    FileRecord {
        folder: folder.to_string(),
        name: name.to_string(),
        file_type: FileType::File,
        size: 0,
        modified_s: 0,
        modified_ns: 0,
        deleted: false,
        no_permissions: true,
        version: counters
            .iter()
            .map(|&(id, value)| Counter { id, value })
            .collect(),
        sequence: counters.last().map(|&(_, value)| value).unwrap_or(0),
        blocks: Vec::new(),
    }
}
