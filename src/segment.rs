//! A contiguous ring of buckets, guarded by one lock.

use crate::bucket::Bucket;
use crate::error::Error;
use crate::sync::{AtomicU32, AtomicUsize, Mutex, Ordering};

/// A segment: a power-of-two ring of buckets, a mutex, a displacement
/// timestamp, and an entry counter.
///
/// Every `put`/`remove` for a key whose home lies in this segment takes
/// `lock`; `get` never does, relying instead on `timestamp` to detect
/// in-flight displacement.
pub struct Segment<V> {
    buckets: Box<[Bucket<V>]>,
    mask: usize,
    lock: Mutex<()>,
    /// Bumped (with release ordering) on every displacement swap within
    /// this segment; never touched by `remove`, which moves nothing.
    timestamp: AtomicU32,
    len: AtomicUsize,
}

/// RAII guard for the home segment's lock, held across the probe / linear
/// scan / displacement steps of `put` and `remove`.
pub struct SegmentGuard<'a, V> {
    segment: &'a Segment<V>,
    #[allow(dead_code)]
    guard: crate::sync::MutexGuard<'a, ()>,
}

impl<V> Segment<V> {
    /// Allocate a segment's bucket ring, reporting allocation failure
    /// rather than aborting the process — matching the fallibility
    /// `Segments::try_new` already provides for the outer segment array,
    /// since a real allocation failure here (this ring can be much larger)
    /// must surface as [`Error::Alloc`] too.
    pub fn try_with_buckets(n_buckets: usize) -> Result<Segment<V>, Error> {
        debug_assert!(n_buckets.is_power_of_two());
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(n_buckets)
            .map_err(|_| Error::Alloc("allocating a segment's bucket ring"))?;
        for _ in 0..n_buckets {
            buckets.push(Bucket::empty());
        }
        Ok(Segment {
            buckets: buckets.into_boxed_slice(),
            mask: n_buckets - 1,
            lock: Mutex::new(()),
            timestamp: AtomicU32::new(0),
            len: AtomicUsize::new(0),
        })
    }

    #[inline]
    pub fn mask(&self) -> usize {
        self.mask
    }

    #[inline]
    pub fn n_buckets(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn bucket(&self, idx: usize) -> &Bucket<V> {
        &self.buckets[idx & self.mask]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Read the displacement timestamp with acquire ordering, pairing with
    /// the release store in `bump_timestamp` below.
    #[inline]
    pub fn timestamp(&self) -> u32 {
        self.timestamp.load(Ordering::Acquire)
    }

    /// Take the segment lock, serializing with every other writer on this
    /// segment.
    pub fn lock(&self) -> SegmentGuard<'_, V> {
        SegmentGuard {
            segment: self,
            guard: self.lock.lock(),
        }
    }
}

impl<'a, V> SegmentGuard<'a, V> {
    #[inline]
    pub fn bucket(&self, idx: usize) -> &Bucket<V> {
        self.segment.bucket(idx)
    }

    #[inline]
    pub fn mask(&self) -> usize {
        self.segment.mask
    }

    #[inline]
    pub fn n_buckets(&self) -> usize {
        self.segment.buckets.len()
    }

    pub fn inc_len(&self) {
        self.segment.len.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_len(&self) {
        self.segment.len.fetch_sub(1, Ordering::Relaxed);
    }

    /// Bump the displacement timestamp with release ordering, publishing
    /// the swap that just happened to lock-free readers.
    pub fn bump_timestamp(&self) {
        self.segment.timestamp.fetch_add(1, Ordering::Release);
    }
}
