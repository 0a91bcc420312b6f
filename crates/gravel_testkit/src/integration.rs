//! Cross-crate integration test helpers.
//!
//! Provides utilities for testing the arena, record store, sort
//! engine, and membership filter together, the way an embedding cache
//! engine uses them.

use gravel_arena::{Arena, ArenaResult};
use gravel_filter::BloomFilter;

/// A test harness that appends records through a duplicate-suppressing
/// filter and tracks expectations for later verification.
pub struct DedupHarness {
    /// The arena under test.
    pub arena: Arena,
    /// The filter gating appends.
    pub filter: BloomFilter,
    /// Payloads actually committed, for verification.
    committed: Vec<Vec<u8>>,
}

impl DedupHarness {
    /// Creates a harness over a fresh heap arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Arena::new(0),
            filter: BloomFilter::new(),
            committed: Vec::new(),
        }
    }

    /// Appends `payload` unless its hash was seen before.
    ///
    /// Returns `true` if the record was committed.
    ///
    /// # Errors
    ///
    /// Propagates arena append failures.
    pub fn append_unique(&mut self, hash: u32, payload: &[u8]) -> ArenaResult<bool> {
        if !self.filter.add_if_absent(hash) {
            return Ok(false);
        }
        self.arena.append_record(payload)?;
        self.committed.push(payload.to_vec());
        Ok(true)
    }

    /// Verifies the arena holds exactly the committed payloads in
    /// order.
    pub fn verify(&self) {
        let stored: Vec<Vec<u8>> = self.arena.records().map(<[u8]>::to_vec).collect();
        assert_eq!(stored, self.committed, "arena contents diverged");
    }

    /// Returns the number of committed records.
    #[must_use]
    pub fn committed_count(&self) -> usize {
        self.committed.len()
    }
}

impl Default for DedupHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Appends `payloads`, sorts the arena under `less`, and asserts the
/// walk is non-decreasing with the payload multiset preserved.
pub fn check_sort_roundtrip<F>(arena: &mut Arena, payloads: &[Vec<u8>], less: F)
where
    F: Fn(&[u8], &[u8]) -> bool,
{
    for payload in payloads {
        arena
            .append_record(payload)
            .expect("failed to append record");
    }
    arena.sort_records(&less).expect("sort failed");

    let sorted: Vec<Vec<u8>> = arena.records().map(<[u8]>::to_vec).collect();
    assert_eq!(sorted.len(), payloads.len(), "record count changed");
    for pair in sorted.windows(2) {
        assert!(
            !less(&pair[1], &pair[0]),
            "walk is not non-decreasing under the comparator"
        );
    }

    let mut expected: Vec<Vec<u8>> = payloads.to_vec();
    expected.sort();
    let mut actual = sorted;
    actual.sort();
    assert_eq!(actual, expected, "payload multiset changed");
}
