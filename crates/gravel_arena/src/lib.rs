//! # Gravel Arena
//!
//! Growable offset-addressed record arena for cache and storage
//! engines.
//!
//! This crate provides the lowest-level building block of Gravel:
//! a contiguous byte region that can grow without invalidating
//! previously returned logical addresses, a length-prefixed record
//! protocol layered on top of it, and an in-place merge sort over
//! those records.
//!
//! ## Design Principles
//!
//! - Addresses are integer offsets into an owning arena, never raw
//!   pointers: growth may relocate the backing memory, so views are
//!   regenerated on demand from offset + current region
//! - Two backings behind one type: plain heap allocation, and a
//!   memory-mapped temp file for arenas that should spill out of
//!   physical memory, with optional one-time heap-to-mmap promotion
//! - Single-writer ownership; no internal synchronization
//! - Misuse (over-max growth, corrupted record chains) surfaces as
//!   typed errors the embedding process treats as fatal; only release
//!   failures are meant to be logged and survived
//!
//! ## Example
//!
//! ```rust
//! use gravel_arena::Arena;
//!
//! let mut arena = Arena::new(0);
//! arena.append_record(b"cherry").unwrap();
//! arena.append_record(b"apple").unwrap();
//! arena.append_record(b"banana").unwrap();
//!
//! arena.sort_records(|a, b| a < b).unwrap();
//!
//! let sorted: Vec<&[u8]> = arena.records().collect();
//! assert_eq!(sorted, vec![&b"apple"[..], b"banana", b"cherry"]);
//! arena.release().unwrap();
//! ```

#![warn(missing_docs)]

mod arena;
mod error;
mod record;
mod sort;

pub use arena::{Arena, ArenaBacking};
pub use error::{ArenaError, ArenaResult};
pub use record::Records;
