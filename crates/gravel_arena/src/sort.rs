//! In-place merge sort over the records of an [`Arena`].
//!
//! The sortable range is partitioned into runs of bounded record count,
//! each run is sorted through an offset indirection, and adjacent
//! sorted runs are then merged in place. A private scratch arena holds
//! the left run of each merge so the destination span can be rewritten
//! front to back without corrupting unread bytes.

use crate::arena::Arena;
use crate::error::{ArenaError, ArenaResult};
use crate::record::{record_len_at, FIRST_RECORD_OFFSET, LEN_PREFIX_SIZE};
use std::cmp::Ordering;

/// Records per checkpointed run. Bounds the base-case sort and the
/// depth of the merge recursion.
const RUN_LENGTH: usize = 1024;

impl Arena {
    /// Sorts every record in the arena under `less`.
    ///
    /// See [`Arena::sort_records_between`].
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Arena::sort_records_between`].
    pub fn sort_records<F>(&mut self, less: F) -> ArenaResult<()>
    where
        F: Fn(&[u8], &[u8]) -> bool,
    {
        let end = self.cursor;
        self.sort_records_between(FIRST_RECORD_OFFSET, end, less)
    }

    /// Reorders the records in `[start, end)` so that walking them in
    /// offset order is non-decreasing under `less`.
    ///
    /// The comparator receives raw payload views and never sees length
    /// prefixes. Records comparing equal keep no particular relative
    /// order, but every record survives: the multiset of payloads is
    /// unchanged. Sorting allocates a scratch arena proportional to the
    /// range being sorted and releases it before returning, on success
    /// and error paths alike.
    ///
    /// `start` and `end` must be record boundaries previously obtained
    /// from the append or walk APIs.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidOffset`] for a zero `start` and
    /// [`ArenaError::Corrupted`] when an internal consistency check
    /// fails mid-sort; both indicate caller error or a corrupted arena
    /// and should be treated as fatal.
    pub fn sort_records_between<F>(
        &mut self,
        start: usize,
        end: usize,
        less: F,
    ) -> ArenaResult<()>
    where
        F: Fn(&[u8], &[u8]) -> bool,
    {
        if start >= end {
            return Ok(());
        }
        if start == 0 {
            return Err(ArenaError::InvalidOffset { offset: 0 });
        }

        // Checkpoint every RUN_LENGTH-th record, plus end itself.
        let mut offsets = Vec::new();
        let mut next = start;
        let mut count = 0usize;
        while next != 0 && next < end {
            if count % RUN_LENGTH == 0 {
                offsets.push(next);
            }
            let (_, n) = self.record_at(next);
            next = n;
            count += 1;
        }
        if offsets.is_empty() {
            return Err(ArenaError::corrupted("no records found in sort range"));
        }
        if offsets.last() != Some(&end) {
            offsets.push(end);
        }

        let scratch = Arena::new((end - start) / 2 * 11 / 10);
        let mut helper = SortHelper {
            arena: self,
            scratch,
            offsets,
            small: Vec::with_capacity(RUN_LENGTH),
            less,
        };
        let result = helper.run();
        let SortHelper { scratch, .. } = helper;
        result.and(scratch.release())
    }
}

struct SortHelper<'a, F> {
    arena: &'a mut Arena,
    scratch: Arena,
    offsets: Vec<usize>,
    small: Vec<usize>,
    less: F,
}

impl<F> SortHelper<'_, F>
where
    F: Fn(&[u8], &[u8]) -> bool,
{
    fn run(&mut self) -> ArenaResult<()> {
        let mut left = self.offsets[0];
        for i in 1..self.offsets.len() {
            let right = self.offsets[i];
            self.sort_run(left, right)?;
            left = right;
        }
        self.merge_runs(0, self.offsets.len() - 1)
    }

    /// Sorts the single run `[start, end)`: the record offsets are
    /// sorted through the comparator, then the run's bytes are
    /// rewritten in that order via the scratch arena.
    fn sort_run(&mut self, start: usize, end: usize) -> ArenaResult<()> {
        let mut small = std::mem::take(&mut self.small);
        small.clear();
        let mut next = start;
        while next != 0 && next < end {
            small.push(next);
            let (_, n) = self.arena.record_at(next);
            next = n;
        }

        let arena = &*self.arena;
        let less = &self.less;
        small.sort_by(|&a, &b| {
            let (left, _) = arena.record_at(a);
            let (right, _) = arena.record_at(b);
            if less(left, right) {
                Ordering::Less
            } else if less(right, left) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });

        self.scratch.reset();
        for &off in &small {
            self.scratch.write(self.arena.record_span(off))?;
        }
        let sorted = self.scratch.bytes();
        if sorted.len() != end - start {
            return Err(ArenaError::corrupted("run length changed during sort"));
        }
        self.arena.slab_mut()[start..end].copy_from_slice(sorted);
        self.small = small;
        Ok(())
    }

    /// Recursively merges the checkpointed runs `[lo, hi)`. A range
    /// spanning a single run is already sorted by `sort_run`.
    fn merge_runs(&mut self, lo: usize, hi: usize) -> ArenaResult<()> {
        debug_assert!(lo <= hi);
        let mid = lo + (hi - lo) / 2;
        if lo == mid {
            return Ok(());
        }

        // mid is a checkpoint index, not a record index: the right half
        // starts at mid, not mid + 1, or whole runs would be skipped.
        self.merge_runs(lo, mid)?;
        self.merge_runs(mid, hi)?;

        let (start, split, end) = (self.offsets[lo], self.offsets[mid], self.offsets[hi]);
        self.merge(start, split, end)
    }

    /// Merges the adjacent sorted regions `[start, split)` and
    /// `[split, end)` into `[start, end)`.
    ///
    /// The left region is copied into the scratch arena first; the
    /// destination is then written lowest offset forward, taking whole
    /// records from the scratch-held left copy or the live right
    /// region. Output never overwrites right-region bytes that have not
    /// been consumed yet.
    fn merge(&mut self, start: usize, split: usize, end: usize) -> ArenaResult<()> {
        if start == split || split == end {
            return Ok(());
        }

        self.scratch.reset();
        self.scratch.write(&self.arena.slab()[start..split])?;

        let left_len = split - start;
        let mut l = 0usize;
        let mut r = split;
        let mut dst = start;

        while dst < end {
            if l == left_len {
                if end - r != end - dst {
                    return Err(ArenaError::corrupted("right run length mismatch in merge"));
                }
                self.arena.slab_mut().copy_within(r..end, dst);
                return Ok(());
            }
            if r == end {
                let rest = &self.scratch.bytes()[l..left_len];
                if rest.len() != end - dst {
                    return Err(ArenaError::corrupted("left run length mismatch in merge"));
                }
                self.arena.slab_mut()[dst..end].copy_from_slice(rest);
                return Ok(());
            }

            let left_rec = LEN_PREFIX_SIZE + record_len_at(self.scratch.bytes(), l);
            let right_rec = LEN_PREFIX_SIZE + record_len_at(self.arena.slab(), r);

            let take_left = {
                let left_payload = &self.scratch.bytes()[l + LEN_PREFIX_SIZE..l + left_rec];
                let right_payload = &self.arena.slab()[r + LEN_PREFIX_SIZE..r + right_rec];
                (self.less)(left_payload, right_payload)
            };

            if take_left {
                if dst + left_rec > end {
                    return Err(ArenaError::corrupted("record overruns merge range"));
                }
                let src = &self.scratch.bytes()[l..l + left_rec];
                self.arena.slab_mut()[dst..dst + left_rec].copy_from_slice(src);
                l += left_rec;
                dst += left_rec;
            } else {
                if dst + right_rec > end {
                    return Err(ArenaError::corrupted("record overruns merge range"));
                }
                self.arena.slab_mut().copy_within(r..r + right_rec, dst);
                r += right_rec;
                dst += right_rec;
            }
        }
        Ok(())
    }
}
