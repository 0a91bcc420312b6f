//! Growable offset-addressed byte arena.

use crate::error::{ArenaError, ArenaResult};
use memmap2::{MmapMut, MmapOptions};
use std::mem;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Initial capacity used when a zero initial size is requested.
const SMALL_ARENA_SIZE: usize = 64;

/// Capacity ceiling used when a zero maximum size is requested.
const DEFAULT_MAX_SIZE: usize = i32::MAX as usize;

/// Capacity ceiling for [`Arena::new`], chosen so growth never hits it
/// in practice.
const UNLIMITED_MAX_SIZE: usize = 256 << 30;

/// Upper bound on a single growth increment.
const GROW_STEP_LIMIT: usize = 1 << 30;

/// The kind of storage backing an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaBacking {
    /// Plain heap allocation.
    Heap,
    /// A memory-mapped temporary file.
    Mmap,
}

/// Backend-specific state. Growth and release dispatch on this.
enum Backing {
    Heap {
        buf: Vec<u8>,
    },
    Mmap {
        map: MmapMut,
        file: NamedTempFile,
    },
    /// The backing store has been released; every region accessor
    /// observes an empty arena.
    Released,
}

impl std::fmt::Debug for Backing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Heap { buf } => f.debug_struct("Heap").field("len", &buf.len()).finish(),
            Self::Mmap { file, .. } => f.debug_struct("Mmap").field("path", &file.path()).finish(),
            Self::Released => f.write_str("Released"),
        }
    }
}

/// A growable contiguous byte region addressed by integer offsets.
///
/// An `Arena` is an append-only byte buffer without the ability to read
/// back through a cursor. It is **not** thread-safe: a single logical
/// owner performs all appends, growth, and sorting sequentially.
///
/// Position 0 is reserved as an end-of-chain sentinel, so the first
/// byte callers ever receive lives at offset 1. Offsets remain stable
/// across growth even though the backing memory may relocate; views
/// returned by [`Arena::allocate`] or [`Arena::record_at`] are only
/// valid until the next mutating call.
///
/// Two backings are available: plain heap allocation, and a
/// memory-mapped temporary file that lets large arenas spill out of
/// physical memory. A heap arena can be configured to promote itself to
/// the mmap backing once it crosses a size threshold, see
/// [`Arena::promote_to_mmap_after`].
///
/// The caller owns the release obligation: call [`Arena::release`] when
/// done. Dropping an arena releases the backing store as a safety net
/// and logs (rather than surfaces) any cleanup failure.
///
/// # Example
///
/// ```rust
/// use gravel_arena::Arena;
///
/// let mut arena = Arena::new(0);
/// arena.append_record(b"a").unwrap();
/// arena.append_record(b"bb").unwrap();
/// assert_eq!(arena.len(), 1 + (4 + 1) + (4 + 2));
/// arena.release().unwrap();
/// ```
#[derive(Debug)]
pub struct Arena {
    backing: Backing,
    /// Write cursor. Starts at 1; byte 0 is the sentinel.
    pub(crate) cursor: usize,
    pub(crate) cur_size: usize,
    max_size: usize,
    auto_promote_after: usize,
}

impl Arena {
    /// Creates a heap-backed arena with a practically unlimited capacity
    /// ceiling.
    ///
    /// A zero `initial_size` gets a small default capacity.
    #[must_use]
    pub fn new(initial_size: usize) -> Self {
        Self::with_heap(initial_size, UNLIMITED_MAX_SIZE)
    }

    /// Creates an arena with explicit sizing and backing.
    ///
    /// Zero sizes get defaults: a small initial capacity and a ceiling
    /// of `i32::MAX` bytes. The sentinel byte at position 0 is written
    /// before the arena is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the mmap backing cannot be set up (temp file
    /// creation, truncation, or the mapping itself). The arena cannot be
    /// used without its backing store, so construction does not fall
    /// back to anything.
    pub fn with_limits(
        initial_size: usize,
        max_size: usize,
        backing: ArenaBacking,
    ) -> ArenaResult<Self> {
        let initial_size = if initial_size == 0 {
            SMALL_ARENA_SIZE
        } else {
            initial_size
        };
        let max_size = if max_size == 0 {
            DEFAULT_MAX_SIZE
        } else {
            max_size
        };
        let initial_size = initial_size.min(max_size);

        match backing {
            ArenaBacking::Heap => Ok(Self::with_heap(initial_size, max_size)),
            ArenaBacking::Mmap => {
                let (map, file) = map_temp_file(initial_size, max_size)?;
                Ok(Self {
                    backing: Backing::Mmap { map, file },
                    cursor: 1,
                    cur_size: initial_size,
                    max_size,
                    auto_promote_after: 0,
                })
            }
        }
    }

    fn with_heap(initial_size: usize, max_size: usize) -> Self {
        let initial_size = if initial_size == 0 {
            SMALL_ARENA_SIZE
        } else {
            initial_size
        };
        Self {
            backing: Backing::Heap {
                buf: vec![0u8; initial_size],
            },
            cursor: 1,
            cur_size: initial_size,
            max_size,
            auto_promote_after: 0,
        }
    }

    /// Returns the number of bytes logically written, including the
    /// reserved sentinel byte.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursor
    }

    /// Returns `true` if nothing but the sentinel has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor == 1
    }

    /// Returns the written region, excluding the sentinel byte.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.slab()[1..self.cursor]
    }

    /// Returns the current allocated capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cur_size
    }

    /// Returns the configured capacity ceiling.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the kind of storage currently backing this arena.
    #[must_use]
    pub fn backing(&self) -> ArenaBacking {
        match self.backing {
            Backing::Heap { .. } => ArenaBacking::Heap,
            Backing::Mmap { .. } | Backing::Released => ArenaBacking::Mmap,
        }
    }

    /// Configures one-time promotion from heap to mmap backing.
    ///
    /// Once a growth call takes the capacity past `size` bytes, the
    /// arena converts itself to a memory-mapped temporary file and the
    /// heap allocation is freed. Has no effect on an arena that is
    /// already memory-mapped.
    pub fn promote_to_mmap_after(&mut self, size: usize) {
        self.auto_promote_after = size;
    }

    /// Ensures at least `n` more bytes can be written past the cursor
    /// without another growth call.
    ///
    /// Growth is doubling-like, capped at a 1 GiB increment but never
    /// less than `n`. The heap backing reallocates and copies the live
    /// prefix; the mmap backing truncates its file (the mapping already
    /// covers the maximum size).
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::MaxSizeExceeded`] if satisfying the request
    /// would push the cursor past the configured maximum — a caller
    /// contract violation, not a condition to retry. Returns
    /// [`ArenaError::Io`] if the mmap backing fails to grow its file or
    /// promotion fails.
    pub fn grow(&mut self, n: usize) -> ArenaResult<()> {
        if self.max_size - self.cursor < n {
            return Err(ArenaError::MaxSizeExceeded {
                max_size: self.max_size,
                cursor: self.cursor,
                requested: n,
            });
        }
        if self.cur_size - self.cursor >= n {
            return Ok(());
        }

        let mut grow_by = (self.cur_size + n).min(GROW_STEP_LIMIT);
        if n > grow_by {
            grow_by = n;
        }
        let target = (self.cur_size + grow_by).min(self.max_size);

        match &mut self.backing {
            Backing::Heap { buf } => {
                if self.auto_promote_after > 0 && target > self.auto_promote_after {
                    debug!(
                        cur_size = self.cur_size,
                        new_size = target,
                        "promoting heap arena to mmap backing"
                    );
                    let (mut map, file) = map_temp_file(target, self.max_size)?;
                    map[..self.cursor].copy_from_slice(&buf[..self.cursor]);
                    self.backing = Backing::Mmap { map, file };
                } else {
                    let mut next = vec![0u8; target];
                    next[..self.cursor].copy_from_slice(&buf[..self.cursor]);
                    *buf = next;
                }
            }
            Backing::Mmap { file, .. } => {
                file.as_file().set_len(target as u64)?;
            }
            Backing::Released => {
                return Err(ArenaError::corrupted("arena already released"));
            }
        }

        debug!(from = self.cur_size, to = target, "arena grown");
        self.cur_size = target;
        Ok(())
    }

    /// Allocates `n` bytes at the cursor and returns a writable view of
    /// them, advancing the cursor.
    ///
    /// The view must be fully written before any further mutating call:
    /// growth may relocate the backing memory, invalidating previously
    /// returned views.
    ///
    /// # Errors
    ///
    /// Propagates growth failures, see [`Arena::grow`].
    pub fn allocate(&mut self, n: usize) -> ArenaResult<&mut [u8]> {
        self.grow(n)?;
        let start = self.cursor;
        self.cursor += n;
        let end = self.cursor;
        Ok(&mut self.slab_mut()[start..end])
    }

    /// Allocates `n` bytes and returns the starting offset instead of a
    /// view, for callers that prefer address-based access later.
    ///
    /// # Errors
    ///
    /// Propagates growth failures, see [`Arena::grow`].
    pub fn allocate_offset(&mut self, n: usize) -> ArenaResult<usize> {
        self.grow(n)?;
        let start = self.cursor;
        self.cursor += n;
        Ok(start)
    }

    /// Appends raw bytes at the cursor, returning the number of bytes
    /// written.
    ///
    /// This does not write a length prefix; it must not be mixed with
    /// the record protocol on the same arena. See
    /// [`Arena::append_record`].
    ///
    /// # Errors
    ///
    /// Propagates growth failures, see [`Arena::grow`].
    pub fn write(&mut self, payload: &[u8]) -> ArenaResult<usize> {
        let dst = self.allocate(payload.len())?;
        dst.copy_from_slice(payload);
        Ok(payload.len())
    }

    /// Rewinds the cursor to the start so the arena can be reused.
    ///
    /// Capacity is retained and memory is not cleared.
    pub fn reset(&mut self) {
        self.cursor = 1;
    }

    /// Releases the backing store.
    ///
    /// The heap backing frees its allocation. The mmap backing unmaps
    /// the region, truncates the backing file to zero, then closes and
    /// deletes it.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Release`] naming the file and the step that
    /// failed. Release runs during teardown, so failures are surfaced
    /// for the caller to log rather than treated as fatal.
    pub fn release(mut self) -> ArenaResult<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> ArenaResult<()> {
        match mem::replace(&mut self.backing, Backing::Released) {
            Backing::Heap { buf } => {
                drop(buf);
                Ok(())
            }
            Backing::Mmap { map, file } => {
                let path = file.path().to_path_buf();
                drop(map);
                file.as_file()
                    .set_len(0)
                    .map_err(|source| ArenaError::Release {
                        step: "truncate",
                        path: path.clone(),
                        source,
                    })?;
                file.close().map_err(|source| ArenaError::Release {
                    step: "remove",
                    path,
                    source,
                })
            }
            Backing::Released => Ok(()),
        }
    }

    /// The full backing region up to the current capacity.
    pub(crate) fn slab(&self) -> &[u8] {
        match &self.backing {
            Backing::Heap { buf } => buf,
            Backing::Mmap { map, .. } => &map[..self.cur_size],
            Backing::Released => &[],
        }
    }

    pub(crate) fn slab_mut(&mut self) -> &mut [u8] {
        match &mut self.backing {
            Backing::Heap { buf } => buf,
            Backing::Mmap { map, .. } => &mut map[..self.cur_size],
            Backing::Released => &mut [],
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            warn!(error = %err, "arena release failed during drop");
        }
    }
}

/// Creates a temp file truncated to `cur_size` and maps it up to
/// `max_size`, so later growth only needs a truncate.
fn map_temp_file(cur_size: usize, max_size: usize) -> ArenaResult<(MmapMut, NamedTempFile)> {
    let file = tempfile::Builder::new().prefix("gravel-arena-").tempfile()?;
    file.as_file().set_len(cur_size as u64)?;
    let map = unsafe { MmapOptions::new().len(max_size).map_mut(file.as_file())? };
    Ok((map, file))
}
