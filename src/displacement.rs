//! The displacement engine: `find_closer_free_bucket`.
//!
//! Drags a free bucket that was found too far from its would-be home
//! (`d >= HOP_RANGE`) inward, one swap at a time, until it lands within
//! `HOP_RANGE` or the cascade runs out of room ("stuck").

use crate::segment::SegmentGuard;

/// Precondition: the segment lock is held (via `guard`), and `free_idx` is
/// an empty bucket at offset `d` (`d >= HOP_RANGE`) from `home`.
///
/// On success, returns `(new_free_idx, new_d)` with `new_d < d` — a new
/// free bucket strictly closer to `home`, reached by relocating one entry
/// "forward" into the old free bucket. Returns `None` if no swap can make
/// progress, signaling the caller to resize.
///
/// The scan picks the **smallest** in-range set bit, not the largest the
/// flagged source implementation used — the smallest is what
/// guarantees `new_d < d` and hence termination of the caller's retry loop.
pub fn find_closer_free_bucket<V>(
    guard: &SegmentGuard<'_, V>,
    home: usize,
    free_idx: usize,
    d: usize,
    hop_range: u32,
) -> Option<(usize, usize)> {
    let mask = guard.mask();
    let mut window = hop_range - 1;

    while window >= 1 {
        // Invariant: `c_offset == d - window` throughout the loop, since C
        // advances by one bucket exactly as `window` drops by one.
        let c_offset = d - window as usize;
        let c_idx = home.wrapping_add(c_offset) & mask;
        let info = guard.bucket(c_idx).hop_info();

        if let Some(j) = (1..window).find(|j| info & (1 << j) != 0) {
            let m_idx = c_idx.wrapping_add(j as usize) & mask;

            // (a) Publish the destination bit before anything else moves,
            // so a concurrent reader always has at least one valid path to
            // the key.
            guard.bucket(c_idx).set_hop_bit(window);
            // (b)+(d) Copy M into F and clear M, as one relocation.
            //
            // SAFETY: the segment lock is held (the `guard` itself proves
            // it), and `free_idx` names a bucket this caller has already
            // established is empty.
            unsafe {
                guard.bucket(m_idx).relocate_to(guard.bucket(free_idx));
            }
            // (c) Clear the source bit now that the move is visible via F.
            guard.bucket(c_idx).clear_hop_bit(j);
            // (e) Publish the whole swap to lock-free readers.
            guard.bump_timestamp();

            let new_d = d - window as usize + j as usize;
            return Some((m_idx, new_d));
        }

        window -= 1;
    }

    None
}
