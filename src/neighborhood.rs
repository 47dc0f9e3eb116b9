//! The neighborhood probe: the cache-local alternative to linear
//! probing that makes hopscotch hashing worth its displacement bookkeeping.

use crate::segment::{Segment, SegmentGuard};

/// Visit only the occupied neighbors of `home`, in offset order, looking
/// for `hkey`.
///
/// Reads `home`'s `hop_info` exactly once into a local, then walks only the
/// set bits — at most `popcount(info)` buckets touched, versus `HOP_RANGE`
/// for a naive scan. Safe to call without the segment lock: a bit observed
/// set whose bucket has since emptied or changed key is simply skipped (a);
/// a bit that was clear at snapshot time but is now set for a matching key
/// (b) is *not* visited here — that race is caught by the timestamp retry
/// in `Table::get`, not by the probe.
pub fn probe_value<V: Clone>(segment: &Segment<V>, home: usize, hkey: u64) -> Option<V> {
    let mask = segment.mask();
    let mut info = segment.bucket(home).hop_info();
    let mut offset = 0u32;
    while info != 0 {
        if info & 1 != 0 {
            let idx = (home.wrapping_add(offset as usize)) & mask;
            let bucket = segment.bucket(idx);
            if bucket.hkey() == hkey {
                // SAFETY: lock-free read path; the caller recheck via
                // the segment timestamp catches any race this misses.
                if let Some(value) = unsafe { bucket.read_value_if(hkey) } {
                    return Some(value);
                }
            }
        }
        info >>= 1;
        offset += 1;
    }
    None
}

/// Same probe, but under the segment lock — used by `put`/`remove`, which
/// need to know *whether* the key is present, not merely read its value.
pub fn probe_index<V>(guard: &SegmentGuard<'_, V>, home: usize, hkey: u64) -> Option<usize> {
    let mask = guard.mask();
    let mut info = guard.bucket(home).hop_info();
    let mut offset = 0u32;
    while info != 0 {
        if info & 1 != 0 {
            let idx = (home.wrapping_add(offset as usize)) & mask;
            if guard.bucket(idx).hkey() == hkey {
                return Some(idx);
            }
        }
        info >>= 1;
        offset += 1;
    }
    None
}
