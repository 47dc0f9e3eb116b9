//! A single cell of a segment's bucket ring.

use std::cell::UnsafeCell;

use crate::sync::{AtomicU32, AtomicU64, Ordering};

/// The sentinel `hkey` meaning "this bucket is empty".
pub const EMPTY: u64 = 0;

/// One `(hashed-key, value, neighborhood bitmap)` triple.
///
/// This stores only the *hashed* key, never the caller's original key —
/// matching is defined purely in terms of the hash. A hash collision
/// between two distinct keys is therefore indistinguishable from a repeat
/// `put` of the same key; this is an explicit property of the design, not
/// an oversight, and callers supplying an opaque, pre-hashed key space get
/// exact semantics. See `DESIGN.md` for the discussion.
///
/// `hkey` and `hop_info` are stored as atomics so the lock-free read path
/// can observe them without racing the writer that holds the
/// segment lock: a torn load there would be undefined behavior, not just a
/// logically stale read. `value` lives behind an `UnsafeCell` — every write
/// to it happens under the segment lock, and every lock-free read is
/// validated against the segment timestamp by the caller (`Table::get`),
/// mirroring how `concurrent::cell::Cell` guards access to data behind an
/// atomic pointer rather than a lock.
pub struct Bucket<V> {
    hkey: AtomicU64,
    hop_info: AtomicU32,
    value: UnsafeCell<Option<V>>,
}

// SAFETY: access to `value` is serialized by the owning segment's lock for
// writers; lock-free readers only read it after observing a matching
// `hkey`, and the caller (`Table::get`) revalidates via the segment
// timestamp afterwards. The bucket carries no thread-affinity of its own.
unsafe impl<V: Send> Send for Bucket<V> {}
unsafe impl<V: Send> Sync for Bucket<V> {}

impl<V> Bucket<V> {
    pub fn empty() -> Bucket<V> {
        Bucket {
            hkey: AtomicU64::new(EMPTY),
            hop_info: AtomicU32::new(0),
            value: UnsafeCell::new(None),
        }
    }

    /// The hashed key stored here, or `EMPTY`.
    ///
    /// Relaxed is sufficient: callers that care about ordering relative to a
    /// displacement synchronize through the segment timestamp instead.
    #[inline]
    pub fn hkey(&self) -> u64 {
        self.hkey.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hkey() == EMPTY
    }

    /// The neighborhood bitmap of a bucket acting as *home* for some cluster.
    #[inline]
    pub fn hop_info(&self) -> u32 {
        self.hop_info.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_hop_bit(&self, bit: u32) {
        self.hop_info.fetch_or(1 << bit, Ordering::Relaxed);
    }

    #[inline]
    pub fn clear_hop_bit(&self, bit: u32) {
        self.hop_info.fetch_and(!(1 << bit), Ordering::Relaxed);
    }

    /// Write a fresh value into this (previously empty) bucket.
    ///
    /// # Safety
    /// Caller must hold the owning segment's lock.
    pub unsafe fn write(&self, hkey: u64, value: V) {
        debug_assert_ne!(hkey, EMPTY);
        *self.value.get() = Some(value);
        self.hkey.store(hkey, Ordering::Release);
    }

    /// Clear an occupied bucket back to empty, returning the value it held.
    ///
    /// # Safety
    /// Caller must hold the owning segment's lock.
    pub unsafe fn clear(&self) -> Option<V> {
        self.hkey.store(EMPTY, Ordering::Release);
        (*self.value.get()).take()
    }

    /// Clone out this bucket's value without disturbing it.
    ///
    /// Used by resize to snapshot every live entry into a candidate table
    /// before that candidate's existence is certain, so a candidate that
    /// turns out too small (or fails to allocate) never costs the caller
    /// anything it hasn't already got a copy of.
    ///
    /// # Safety
    /// Caller must hold exclusive access to the owning segment (e.g. the
    /// table-wide write lock during resize) — no concurrent writer may be
    /// mutating this bucket.
    pub unsafe fn snapshot(&self) -> Option<V>
    where
        V: Clone,
    {
        (*self.value.get()).clone()
    }

    /// Move this bucket's contents into `dest`, leaving `self` empty.
    ///
    /// Used by the displacement engine: the destination's `hkey` is
    /// published *before* the source is cleared, so a concurrent reader
    /// always has at least one valid path to the key.
    ///
    /// # Safety
    /// Caller must hold the lock shared by both buckets' segment.
    pub unsafe fn relocate_to(&self, dest: &Bucket<V>) {
        let value = (*self.value.get()).take();
        let hkey = self.hkey();
        *dest.value.get() = value;
        dest.hkey.store(hkey, Ordering::Release);
        self.hkey.store(EMPTY, Ordering::Release);
    }

    /// Read the value, if the bucket still (and after the read, still)
    /// holds `hkey`.
    ///
    /// # Safety
    /// May be called without the segment lock. The caller
    /// must already have observed `self.hkey() == hkey` before calling
    /// this, and must treat a `None` result — or even a `Some` result, if
    /// the segment timestamp changed concurrently — as requiring the
    /// retry discipline in `Table::get`.
    pub unsafe fn read_value_if(&self, hkey: u64) -> Option<V>
    where
        V: Clone,
    {
        if self.hkey.load(Ordering::Acquire) != hkey {
            return None;
        }
        let value = (*self.value.get()).clone();
        if self.hkey.load(Ordering::Relaxed) != hkey {
            // The bucket moved out from under us mid-read; the segment
            // timestamp recheck in `Table::get` will catch this and retry.
            return None;
        }
        value
    }
}
