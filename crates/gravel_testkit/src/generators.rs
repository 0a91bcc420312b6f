//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random record payloads and hash
//! batches that exercise the arena and filter invariants.

use proptest::prelude::*;

/// Strategy for generating a single record payload (arbitrary bytes).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for generating a batch of record payloads.
pub fn payload_batch_strategy(
    min_records: usize,
    max_records: usize,
) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(payload_strategy(), min_records..max_records)
}

/// Strategy for generating a batch of 32-bit hash values.
pub fn hash_batch_strategy(max_hashes: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(any::<u32>(), 0..max_hashes)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn payloads_respect_the_size_bound(payload in payload_strategy()) {
            prop_assert!(payload.len() < 512);
        }

        #[test]
        fn batches_respect_the_count_bounds(batch in payload_batch_strategy(1, 20)) {
            prop_assert!(!batch.is_empty());
            prop_assert!(batch.len() < 20);
        }
    }
}
