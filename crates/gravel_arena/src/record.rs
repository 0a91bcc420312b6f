//! Length-prefixed record storage over an [`Arena`].
//!
//! Every record is a 4-byte big-endian length prefix followed by that
//! many payload bytes, with no alignment padding and no checksum.
//! Records form a chain in storage order: a record's next offset is the
//! start of the following record, or 0 (the sentinel) past the last one.

use crate::arena::Arena;
use crate::error::{ArenaError, ArenaResult};

/// Offset of the first record in any arena; position 0 is the sentinel.
pub(crate) const FIRST_RECORD_OFFSET: usize = 1;

/// Size of the big-endian length prefix.
pub(crate) const LEN_PREFIX_SIZE: usize = 4;

/// Reads the length prefix stored at `offset`.
pub(crate) fn record_len_at(slab: &[u8], offset: usize) -> usize {
    u32::from_be_bytes([
        slab[offset],
        slab[offset + 1],
        slab[offset + 2],
        slab[offset + 3],
    ]) as usize
}

impl Arena {
    /// Appends `payload` as a length-prefixed record, returning the
    /// offset of its length prefix.
    ///
    /// Records must not be interleaved with raw [`Arena::allocate`] or
    /// [`Arena::write`] calls on the same arena: readers assume every
    /// stored unit obeys the length-prefix convention.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::RecordTooLarge`] if the payload does not
    /// fit a `u32` length, and propagates growth failures.
    pub fn append_record(&mut self, payload: &[u8]) -> ArenaResult<usize> {
        let len = u32::try_from(payload.len())
            .map_err(|_| ArenaError::RecordTooLarge { len: payload.len() })?;
        let start = self.cursor;
        let dst = self.allocate(LEN_PREFIX_SIZE + payload.len())?;
        dst[..LEN_PREFIX_SIZE].copy_from_slice(&len.to_be_bytes());
        dst[LEN_PREFIX_SIZE..].copy_from_slice(payload);
        Ok(start)
    }

    /// Returns the record payload stored at `offset` and the offset of
    /// the next record.
    ///
    /// An `offset` at or past the cursor yields an empty view and 0.
    /// The next offset collapses to 0 when the chain ends at the
    /// cursor.
    ///
    /// # Panics
    ///
    /// Panics if the bytes at `offset` do not hold a record (a
    /// misaligned offset or an arena corrupted by raw writes). A
    /// corrupted arena cannot be read safely, so this is not surfaced
    /// as a recoverable error.
    #[must_use]
    pub fn record_at(&self, offset: usize) -> (&[u8], usize) {
        if offset >= self.cursor {
            return (&[], 0);
        }
        let slab = self.slab();
        let len = record_len_at(slab, offset);
        let start = offset + LEN_PREFIX_SIZE;
        let mut next = start + len;
        let payload = &slab[start..next];
        if next >= self.cursor {
            next = 0;
        }
        (payload, next)
    }

    /// Calls `visitor` with every record payload in insertion order.
    ///
    /// # Errors
    ///
    /// Stops at and propagates the first error the visitor returns.
    pub fn for_each_record<F>(&self, mut visitor: F) -> ArenaResult<()>
    where
        F: FnMut(&[u8]) -> ArenaResult<()>,
    {
        for payload in self.records() {
            visitor(payload)?;
        }
        Ok(())
    }

    /// Returns an iterator over record payloads in insertion order.
    #[must_use]
    pub fn records(&self) -> Records<'_> {
        Records {
            arena: self,
            next: FIRST_RECORD_OFFSET,
        }
    }

    /// Walks the full record chain and collects every record's starting
    /// offset.
    ///
    /// This is an O(n) full walk; use it for diagnostics and sorting
    /// setup, not on hot paths.
    #[must_use]
    pub fn record_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::new();
        let mut next = FIRST_RECORD_OFFSET;
        while next != 0 && next < self.cursor {
            offsets.push(next);
            let (_, n) = self.record_at(next);
            next = n;
        }
        offsets
    }

    /// Returns the whole record span at `offset`, length prefix
    /// included. Used to relocate records without re-encoding them.
    pub(crate) fn record_span(&self, offset: usize) -> &[u8] {
        let slab = self.slab();
        let len = record_len_at(slab, offset);
        &slab[offset..offset + LEN_PREFIX_SIZE + len]
    }
}

/// Iterator over record payloads, created by [`Arena::records`].
#[derive(Debug)]
pub struct Records<'a> {
    arena: &'a Arena,
    next: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == 0 || self.next >= self.arena.cursor {
            return None;
        }
        let (payload, next) = self.arena.record_at(self.next);
        self.next = next;
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn append_records_and_walk() {
        let mut arena = Arena::new(0);
        arena.append_record(b"a").unwrap();
        arena.append_record(b"bb").unwrap();
        arena.append_record(b"ccc").unwrap();

        assert_eq!(arena.len(), 1 + (4 + 1) + (4 + 2) + (4 + 3));

        let collected: Vec<&[u8]> = arena.records().collect();
        assert_eq!(collected, vec![&b"a"[..], &b"bb"[..], &b"ccc"[..]]);
    }

    #[test]
    fn record_at_follows_the_chain() {
        let mut arena = Arena::new(0);
        let first = arena.append_record(b"one").unwrap();
        let second = arena.append_record(b"two").unwrap();

        let (payload, next) = arena.record_at(first);
        assert_eq!(payload, b"one");
        assert_eq!(next, second);

        let (payload, next) = arena.record_at(second);
        assert_eq!(payload, b"two");
        assert_eq!(next, 0);
    }

    #[test]
    fn record_at_past_cursor_is_end_of_chain() {
        let arena = Arena::new(0);
        let (payload, next) = arena.record_at(100);
        assert!(payload.is_empty());
        assert_eq!(next, 0);
    }

    #[test]
    fn empty_payload_record_is_visited() {
        let mut arena = Arena::new(0);
        arena.append_record(b"x").unwrap();
        arena.append_record(b"").unwrap();
        arena.append_record(b"y").unwrap();

        let collected: Vec<&[u8]> = arena.records().collect();
        assert_eq!(collected, vec![&b"x"[..], &b""[..], &b"y"[..]]);
    }

    #[test]
    fn empty_arena_visits_nothing() {
        let arena = Arena::new(0);
        let mut visits = 0;
        arena
            .for_each_record(|_| {
                visits += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(visits, 0);
        assert!(arena.record_offsets().is_empty());
    }

    #[test]
    fn visitor_error_stops_iteration() {
        let mut arena = Arena::new(0);
        arena.append_record(b"first").unwrap();
        arena.append_record(b"second").unwrap();

        let mut seen = Vec::new();
        let err = arena.for_each_record(|payload| {
            seen.push(payload.to_vec());
            Err(ArenaError::corrupted("stop here"))
        });
        assert!(err.is_err());
        assert_eq!(seen, vec![b"first".to_vec()]);
    }

    #[test]
    fn record_offsets_match_appended_order() {
        let mut arena = Arena::new(0);
        let mut expected = Vec::new();
        for payload in [&b"a"[..], b"bb", b"ccc", b"dddd"] {
            expected.push(arena.append_record(payload).unwrap());
        }
        assert_eq!(arena.record_offsets(), expected);
    }

    #[test]
    fn roundtrip_preserves_payload_bytes() {
        let mut arena = Arena::new(0);
        let payloads: Vec<Vec<u8>> = (0u8..50).map(|i| vec![i; i as usize]).collect();
        for p in &payloads {
            arena.append_record(p).unwrap();
        }
        for (offset, expected) in arena.record_offsets().into_iter().zip(&payloads) {
            let (payload, _) = arena.record_at(offset);
            assert_eq!(payload, &expected[..]);
        }
    }

    #[test]
    fn record_span_includes_prefix() {
        let mut arena = Arena::new(0);
        let off = arena.append_record(b"abc").unwrap();
        let span = arena.record_span(off);
        assert_eq!(span.len(), 4 + 3);
        assert_eq!(&span[..4], &3u32.to_be_bytes());
        assert_eq!(&span[4..], b"abc");
    }

    proptest! {
        #[test]
        fn walk_reproduces_any_append_sequence(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 0..64),
        ) {
            let mut arena = Arena::new(0);
            for p in &payloads {
                arena.append_record(p).unwrap();
            }
            let offsets = arena.record_offsets();
            prop_assert_eq!(offsets.len(), payloads.len());
            for (offset, expected) in offsets.into_iter().zip(&payloads) {
                let (payload, _) = arena.record_at(offset);
                prop_assert_eq!(payload, &expected[..]);
            }
        }
    }

    #[test]
    fn records_survive_growth_across_backings() {
        for backing in [crate::ArenaBacking::Heap, crate::ArenaBacking::Mmap] {
            let mut arena = Arena::with_limits(32, 1 << 20, backing).unwrap();
            let payloads: Vec<Vec<u8>> = (0..200u32).map(|i| i.to_be_bytes().to_vec()).collect();
            for p in &payloads {
                arena.append_record(p).unwrap();
            }
            let collected: Vec<Vec<u8>> = arena.records().map(<[u8]>::to_vec).collect();
            assert_eq!(collected, payloads);
            arena.release().unwrap();
        }
    }
}
