//! # Gravel Filter
//!
//! Compact probabilistic set-membership filter for Gravel.
//!
//! The filter answers approximate "have I seen hash X" queries with a
//! tunable false-positive rate and no false negatives. It is used to
//! skip redundant work — typically checking whether a record is worth
//! appending before committing it to an arena. The encoded form is a
//! plain byte buffer (bit array plus a trailing probe-count byte) that
//! round-trips through CBOR for external storage.
//!
//! ## Example
//!
//! ```rust
//! use gravel_filter::BloomFilter;
//!
//! let mut filter = BloomFilter::new();
//! filter.add(&[1, 2, 3]);
//! assert!(filter.contains(2));
//!
//! let stored = filter.to_bytes().unwrap();
//! let restored = BloomFilter::from_bytes(&stored).unwrap();
//! assert!(restored.contains(3));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod filter;

pub use error::{FilterError, FilterResult};
pub use filter::{BloomFilter, DEFAULT_BITS_PER_KEY};
