//! Arena fixtures and helpers.
//!
//! Provides convenience functions for setting up arenas in tests and
//! common record workloads.

use gravel_arena::{Arena, ArenaBacking};

/// Creates a heap arena pre-populated with the given record payloads.
pub fn arena_with_records(payloads: &[&[u8]]) -> Arena {
    let mut arena = Arena::new(0);
    for payload in payloads {
        arena
            .append_record(payload)
            .expect("failed to append fixture record");
    }
    arena
}

/// Runs a test against a fresh heap arena.
pub fn with_heap_arena<F, R>(f: F) -> R
where
    F: FnOnce(&mut Arena) -> R,
{
    let mut arena = Arena::new(0);
    let result = f(&mut arena);
    arena.release().expect("failed to release heap arena");
    result
}

/// Runs a test against a fresh mmap-backed arena.
///
/// The backing temp file is deleted when the closure returns.
pub fn with_mmap_arena<F, R>(f: F) -> R
where
    F: FnOnce(&mut Arena) -> R,
{
    let mut arena =
        Arena::with_limits(0, 0, ArenaBacking::Mmap).expect("failed to create mmap arena");
    let result = f(&mut arena);
    arena.release().expect("failed to release mmap arena");
    result
}

/// Runs a test against fresh arenas of both backings in turn.
pub fn with_each_backing<F>(mut f: F)
where
    F: FnMut(&mut Arena),
{
    with_heap_arena(|arena| f(arena));
    with_mmap_arena(|arena| f(arena));
}

/// Generates `count` payloads of `size` bytes with distinct contents.
pub fn sequential_payloads(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            let mut payload = vec![(i % 251) as u8; size.max(4)];
            payload[..4].copy_from_slice(&(i as u32).to_be_bytes());
            payload
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_arena_holds_records() {
        let arena = arena_with_records(&[&b"a"[..], b"bb", b"ccc"]);
        assert_eq!(arena.records().count(), 3);
    }

    #[test]
    fn each_backing_sees_the_same_behavior() {
        with_each_backing(|arena| {
            arena.append_record(b"payload").unwrap();
            assert_eq!(arena.records().next(), Some(&b"payload"[..]));
        });
    }

    #[test]
    fn sequential_payloads_are_distinct() {
        let payloads = sequential_payloads(100, 16);
        for pair in payloads.windows(2) {
            assert_ne!(pair[0], pair[1]);
            assert_eq!(pair[0].len(), 16);
        }
    }
}
