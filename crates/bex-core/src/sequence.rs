//! Sequence allocation for announced records.

use std::sync::atomic::{AtomicU64, Ordering};

/// Allocates the strictly increasing per-device sequence numbers attached
/// to announced records.
///
/// A lost announcement never returns its sequence; gaps are allowed,
/// regressions are not.
pub trait Sequencer: Send + Sync {
    /// Returns the next sequence number, strictly greater than any number
    /// previously returned by this instance.
    fn next_sequence(&self) -> u64;
}

/// In-process sequencer backed by an atomic counter.
#[derive(Debug)]
pub struct AtomicSequencer {
    last: AtomicU64,
}

impl AtomicSequencer {
    /// Creates a sequencer whose first allocation is `floor + 1`.
    ///
    /// Pass the highest sequence already persisted for this device so a
    /// restart cannot reuse numbers.
    pub fn new(floor: u64) -> Self {
        Self {
            last: AtomicU64::new(floor),
        }
    }
}

impl Default for AtomicSequencer {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Sequencer for AtomicSequencer {
    fn next_sequence(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}
