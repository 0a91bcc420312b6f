//! Byte-encoded bloom filter with double-hashing probes.

use crate::error::{FilterError, FilterResult};
use serde::{Deserialize, Serialize};

/// Default number of filter bits budgeted per key.
pub const DEFAULT_BITS_PER_KEY: usize = 10;

/// Minimum bit-array size. Very small key sets would otherwise see a
/// high false-positive rate.
const MIN_FILTER_BITS: usize = 64;

/// Largest meaningful probe count; trailing bytes above this are
/// reserved for future encodings.
const MAX_PROBES: u32 = 30;

fn default_bits_per_key() -> usize {
    DEFAULT_BITS_PER_KEY
}

/// A compact probabilistic set-membership filter over 32-bit hashes.
///
/// The encoded form is a bit array followed by a single trailing byte
/// holding the probe count `k`. Queries may report false positives at
/// a rate tuned by the bits-per-key budget, but never false negatives:
/// every hash passed to [`BloomFilter::add`] is reported present
/// afterwards.
///
/// `add` sizes the bit array from the batch passed to that call (it
/// never shrinks an existing array). Callers wanting classic
/// one-shot bloom semantics should pass the full hash batch in a
/// single `add` call; [`BloomFilter::add_if_absent`] is the supported
/// incremental path for duplicate suppression.
///
/// # Example
///
/// ```rust
/// use gravel_filter::BloomFilter;
///
/// let mut filter = BloomFilter::new();
/// filter.add(&[1, 2, 3]);
/// assert!(filter.contains(1));
/// assert!(filter.contains(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    /// Bit array plus trailing probe-count byte.
    bitset: Vec<u8>,
    /// Configured bits-per-key budget; not part of the persisted form.
    #[serde(skip, default = "default_bits_per_key")]
    bits_per_key: usize,
}

impl BloomFilter {
    /// Creates an empty filter with the default bits-per-key budget.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bits_per_key(DEFAULT_BITS_PER_KEY)
    }

    /// Creates an empty filter with an explicit bits-per-key budget.
    #[must_use]
    pub fn with_bits_per_key(bits_per_key: usize) -> Self {
        let mut filter = Self {
            bitset: Vec::new(),
            bits_per_key,
        };
        filter.add(&[]);
        filter
    }

    /// Probe count derived from the bits-per-key budget, clamped to
    /// `[1, 30]`. 0.69 approximates ln 2.
    fn probe_count(&self) -> u32 {
        ((self.bits_per_key as f64 * 0.69) as u32).clamp(1, MAX_PROBES)
    }

    /// Adds a batch of hashes to the filter.
    ///
    /// The bit array is sized from this call's batch (floored at 64
    /// bits, rounded up to whole bytes) and never shrinks. Each hash
    /// sets `k` bits chosen by double hashing: the probe position is
    /// `h mod n_bits`, with `h` advanced by a fixed rotation of the
    /// original hash between probes.
    pub fn add(&mut self, hashes: &[u32]) {
        let k = self.probe_count();

        let n_bits = hashes
            .len()
            .saturating_mul(self.bits_per_key)
            .max(MIN_FILTER_BITS);
        let n_bytes = (n_bits + 7) / 8;
        let new_len = (n_bytes + 1).max(self.bitset.len());
        self.bitset.resize(new_len, 0);

        let n_bits = ((new_len - 1) * 8) as u32;
        for &hash in hashes {
            let delta = hash >> 17 | hash << 15;
            let mut h = hash;
            for _ in 0..k {
                let bit_pos = h % n_bits;
                self.bitset[(bit_pos / 8) as usize] |= 1 << (bit_pos % 8);
                h = h.wrapping_add(delta);
            }
        }
        self.bitset[new_len - 1] = k as u8;
    }

    /// Adds `hash` only if it is not already present.
    ///
    /// Returns `false` without mutating the filter when the hash is
    /// (probably) present, `true` after adding it otherwise.
    pub fn add_if_absent(&mut self, hash: u32) -> bool {
        if self.contains(hash) {
            return false;
        }
        self.add(&[hash]);
        true
    }

    /// Reports whether `hash` might have been added.
    ///
    /// `false` means definitely absent; `true` means present subject to
    /// the false-positive rate. An untrained filter (fewer than two
    /// encoded bytes) reports everything absent. A trailing probe
    /// count above 30 is a reserved encoding and conservatively
    /// matches everything.
    #[must_use]
    pub fn contains(&self, hash: u32) -> bool {
        let f = &self.bitset;
        if f.len() < 2 {
            return false;
        }
        let k = u32::from(f[f.len() - 1]);
        if k > MAX_PROBES {
            return true;
        }
        let n_bits = ((f.len() - 1) * 8) as u32;
        let delta = hash >> 17 | hash << 15;
        let mut h = hash;
        for _ in 0..k {
            let bit_pos = h % n_bits;
            if f[(bit_pos / 8) as usize] & (1 << (bit_pos % 8)) == 0 {
                return false;
            }
            h = h.wrapping_add(delta);
        }
        true
    }

    /// Resets the filter to its empty state, keeping the configured
    /// bits-per-key budget.
    pub fn clear(&mut self) {
        *self = Self::with_bits_per_key(self.bits_per_key);
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let len = self.bitset.len();
        len < 2 || self.bitset[..len - 1].iter().all(|&b| b == 0)
    }

    /// Length of the encoded form in bytes, trailing probe-count byte
    /// included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.bitset.len()
    }

    /// Serializes the filter for external storage.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::EncodingFailed`] if CBOR encoding fails.
    pub fn to_bytes(&self) -> FilterResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|err| FilterError::encoding_failed(err.to_string()))?;
        Ok(buf)
    }

    /// Restores a filter previously serialized with
    /// [`BloomFilter::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::DecodingFailed`] if the bytes are not a
    /// valid encoded filter.
    pub fn from_bytes(bytes: &[u8]) -> FilterResult<Self> {
        ciborium::de::from_reader(bytes)
            .map_err(|err| FilterError::decoding_failed(err.to_string()))
    }
}

impl Default for BloomFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Spread consecutive integers into plausible hash values.
    fn spread(i: u32) -> u32 {
        i.wrapping_mul(0x9e37_79b9)
    }

    #[test]
    fn new_filter_reports_everything_absent() {
        let filter = BloomFilter::new();
        for i in 0..100 {
            assert!(!filter.contains(spread(i)), "fresh filter matched {i}");
        }
    }

    #[test]
    fn added_hashes_are_present() {
        let mut filter = BloomFilter::new();
        filter.add(&[1, 2, 3]);
        assert!(filter.contains(1));
        assert!(filter.contains(2));
        assert!(filter.contains(3));
    }

    #[test]
    fn minimum_sizing_is_sixty_four_bits() {
        let filter = BloomFilter::new();
        assert_eq!(filter.encoded_len(), 64 / 8 + 1);
    }

    #[test]
    fn batch_sizing_follows_bits_per_key() {
        let mut filter = BloomFilter::new();
        let hashes: Vec<u32> = (0..100).map(spread).collect();
        filter.add(&hashes);
        // 100 keys * 10 bits = 1000 bits = 125 bytes, plus the probe
        // count byte.
        assert_eq!(filter.encoded_len(), 126);
    }

    #[test]
    fn add_if_absent_second_call_is_a_noop() {
        let mut filter = BloomFilter::new();
        assert!(filter.add_if_absent(0xCAFE));
        let encoded = filter.to_bytes().unwrap();

        assert!(!filter.add_if_absent(0xCAFE));
        assert_eq!(filter.to_bytes().unwrap(), encoded);
    }

    #[test]
    fn incremental_adds_keep_earlier_hashes() {
        let mut filter = BloomFilter::new();
        let first: Vec<u32> = (0..500).map(spread).collect();
        filter.add(&first);
        for i in 500..520 {
            filter.add_if_absent(spread(i));
        }
        for i in 0..520 {
            assert!(filter.contains(spread(i)), "lost hash {i}");
        }
    }

    #[test]
    fn mostly_absent_for_unseen_hashes() {
        let mut filter = BloomFilter::new();
        let present: Vec<u32> = (0..1000).map(spread).collect();
        filter.add(&present);

        let sample = 10_000u32;
        let false_positives = (0..sample)
            .map(|i| spread(i + 1_000_000))
            .filter(|&h| filter.contains(h))
            .count();
        let rate = false_positives as f64 / f64::from(sample);
        assert!(rate < 0.05, "false positive rate too high: {rate:.4}");
    }

    #[test]
    fn reserved_probe_count_matches_everything() {
        let filter = BloomFilter {
            bitset: vec![0, 31],
            bits_per_key: DEFAULT_BITS_PER_KEY,
        };
        assert!(filter.contains(0));
        assert!(filter.contains(0xFFFF_FFFF));
    }

    #[test]
    fn short_buffer_reports_absent() {
        for bitset in [Vec::new(), vec![0x42]] {
            let filter = BloomFilter {
                bitset,
                bits_per_key: DEFAULT_BITS_PER_KEY,
            };
            assert!(!filter.contains(7));
        }
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut filter = BloomFilter::with_bits_per_key(12);
        filter.add(&[5, 6, 7]);
        assert!(!filter.is_empty());
        filter.clear();
        assert!(filter.is_empty());
        assert!(!filter.contains(5));
    }

    #[test]
    fn serialization_roundtrip() {
        let mut filter = BloomFilter::new();
        filter.add(&(0..300).map(spread).collect::<Vec<_>>());

        let bytes = filter.to_bytes().unwrap();
        let restored = BloomFilter::from_bytes(&bytes).unwrap();
        assert_eq!(restored, filter);
        for i in 0..300 {
            assert!(restored.contains(spread(i)));
        }
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        let err = BloomFilter::from_bytes(&[0xFF, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, FilterError::DecodingFailed { .. }));
    }

    proptest! {
        #[test]
        fn no_false_negatives(hashes in prop::collection::vec(any::<u32>(), 0..200)) {
            let mut filter = BloomFilter::new();
            filter.add(&hashes);
            for &h in &hashes {
                prop_assert!(filter.contains(h));
            }
        }

        #[test]
        fn roundtrip_preserves_membership(hashes in prop::collection::vec(any::<u32>(), 1..100)) {
            let mut filter = BloomFilter::new();
            filter.add(&hashes);
            let restored = BloomFilter::from_bytes(&filter.to_bytes().unwrap()).unwrap();
            for &h in &hashes {
                prop_assert!(restored.contains(h));
            }
        }
    }
}
