//! Version vector construction.

/// One (device, sequence) entry in a version vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    /// Device identity projection, see [`DeviceId::short_id`](crate::DeviceId::short_id).
    pub id: u64,
    /// Sequence number the device held when it announced the revision.
    pub value: u64,
}

/// Builds the version vector for a new record revision.
///
/// Previous counters are carried over verbatim, in order, and one counter
/// for the local device is appended. The local device is never collapsed
/// into an earlier entry, matching the wire behavior of existing peers.
pub fn extend_version(prev: &[Counter], device: u64, sequence: u64) -> Vec<Counter> {
    let mut counters = Vec::with_capacity(prev.len() + 1);
    counters.extend_from_slice(prev);
    counters.push(Counter {
        id: device,
        value: sequence,
    });
    counters
}
