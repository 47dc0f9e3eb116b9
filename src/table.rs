//! The table façade: `put`, `get`, `remove`, `dispose`, and the retry loop
//! that ties insertion to resize.

use std::hash::Hash;
use std::marker::PhantomData;

use parking_lot::RwLock;

use crate::bucket;
use crate::displacement;
use crate::error::Error;
use crate::hash;
use crate::neighborhood;
use crate::params::Params;
use crate::segment::SegmentGuard;
use crate::segments::Segments;

/// A concurrent hash map based on hopscotch hashing.
///
/// Keys are only ever seen through their 64-bit hash — this crate
/// stores no key, so a hash collision between two distinct `K` values is
/// indistinguishable from a repeated `put` of the same key (see
/// `DESIGN.md`). `V: Clone` is required because the lock-free read path
/// can never hold a reference across the point where a
/// concurrent displacement might invalidate it — `get` clones its way out
/// instead of returning a guard, unlike `chashmap`'s guard-based API, which
/// can afford to hold a per-bucket lock for the guard's lifetime.
pub struct Table<K, V> {
    segments: RwLock<Segments<V>>,
    params: Params,
    logger: slog::Logger,
    _marker: PhantomData<fn(K)>,
}

impl<K, V> Table<K, V> {
    /// Create a table with the default parameters.
    pub fn new() -> Result<Table<K, V>, Error> {
        Table::with_params(Params::default())
    }

    /// Create a table with explicit parameters, rejecting misconfiguration
    /// before any allocation.
    pub fn with_params(params: Params) -> Result<Table<K, V>, Error> {
        params.validate()?;
        let logger = params.logger();
        slog::debug!(
            logger,
            "creating table";
            "segments" => params.n_segments,
            "buckets_per_segment" => params.n_buckets_per_segment,
            "hop_range" => params.hop_range,
            "add_range" => params.add_range,
        );
        let segments = Segments::try_new(params.n_segments, params.n_buckets_per_segment)?;
        Ok(Table {
            segments: RwLock::new(segments),
            params,
            logger,
            _marker: PhantomData,
        })
    }

    /// Number of live entries, summed atomically across segments — not an
    /// iteration, just the running counter every `Segment` keeps.
    pub fn len(&self) -> usize {
        self.segments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets across every segment (not a load-factor-adjusted
    /// capacity — hopscotch hashing has no probe-sequence degradation to
    /// budget for the way open addressing with linear probing does).
    pub fn buckets(&self) -> usize {
        let segs = self.segments.read();
        segs.n_segments() * segs.n_buckets_per_segment()
    }

    /// Explicit, consuming teardown. `Drop` already frees every
    /// segment's bucket ring and lock; this exists so the table's external
    /// interface names the operation the spec does.
    pub fn dispose(self) {
        drop(self)
    }

    /// Check the segment-local invariants against the table's
    /// current (quiescent) state: every set `hop_info` bit names an
    /// occupied bucket whose home is the bit's owner, every occupied
    /// bucket's offset from its home is `< HOP_RANGE`, and no segment holds
    /// a hash twice. Used by the property tests in `tests.rs`; not part of
    /// the public API.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        let segs = self.segments.read();
        let hop_range = self.params.hop_range as usize;

        for (seg_idx, segment) in segs.iter().enumerate() {
            let n = segment.n_buckets();
            let mut seen_hashes = std::collections::HashSet::new();

            for home in 0..n {
                let info = segment.bucket(home).hop_info();
                for bit in 0..32u32 {
                    if info & (1 << bit) == 0 {
                        continue;
                    }
                    let idx = (home + bit as usize) & segment.mask();
                    let b = segment.bucket(idx);
                    if b.is_empty() {
                        return Err(format!(
                            "segment {seg_idx}: home {home} bit {bit} set but bucket {idx} is empty"
                        ));
                    }
                }
            }

            for idx in 0..n {
                let bucket = segment.bucket(idx);
                if bucket.is_empty() {
                    continue;
                }
                let hkey = bucket.hkey();
                if !seen_hashes.insert(hkey) {
                    return Err(format!("segment {seg_idx}: duplicate hash {hkey}"));
                }
                let home = hkey as usize & segment.mask();
                let offset = (idx.wrapping_sub(home)) & segment.mask();
                if offset >= hop_range {
                    return Err(format!(
                        "segment {seg_idx}: bucket {idx} (home {home}) at offset {offset} >= HOP_RANGE {hop_range}"
                    ));
                }
                if segment.bucket(home).hop_info() & (1 << offset) == 0 {
                    return Err(format!(
                        "segment {seg_idx}: bucket {idx} occupied at offset {offset} from home {home}, but hop_info bit unset"
                    ));
                }
            }
        }
        Ok(())
    }
}

impl<K: Hash, V: Clone> Table<K, V> {
    /// Insert `key => value`, or do nothing if `key` is already present.
    pub fn put(&self, key: K, value: V) -> Result<(), Error> {
        let hkey = hash::hash(&key);
        let mut value = value;

        loop {
            let segs = self.segments.read();
            let generation = segs.generation();
            let segment = segs.segment(hkey);
            let home = hkey as usize & segment.mask();
            let guard = segment.lock();

            if neighborhood::probe_index(&guard, home, hkey).is_some() {
                // Step 2: key already present.
                return Ok(());
            }

            match insert_into_segment(
                &guard,
                home,
                hkey,
                value,
                self.params.hop_range,
                self.params.add_range,
            ) {
                Ok(()) => {
                    guard.inc_len();
                    return Ok(());
                }
                Err(v) => {
                    // Stuck: neither a free bucket within
                    // ADD_RANGE nor a displacement cascade succeeded. Drop
                    // both locks before growing — `grow` takes the write
                    // lock on the same `RwLock`.
                    slog::debug!(self.logger, "insert stuck, triggering resize"; "generation" => generation);
                    value = v;
                    drop(guard);
                    drop(segs);
                    self.grow(generation)?;
                }
            }
        }
    }

    /// Look up `key`, lock-free.
    pub fn get(&self, key: &K) -> Option<V> {
        let hkey = hash::hash(key);
        let mut tries = 0u32;

        loop {
            let segs = self.segments.read();
            let segment = segs.segment(hkey);
            let home = hkey as usize & segment.mask();

            let ts0 = segment.timestamp();
            if let Some(value) = neighborhood::probe_value(segment, home, hkey) {
                return Some(value);
            }
            let ts1 = segment.timestamp();

            if ts1 != ts0 && tries < self.params.max_tries {
                tries += 1;
                continue;
            }
            return None;
        }
    }

    /// Remove `key`, returning its prior value if present.
    pub fn remove(&self, key: &K) -> Option<V> {
        let hkey = hash::hash(key);
        let segs = self.segments.read();
        let segment = segs.segment(hkey);
        let home = hkey as usize & segment.mask();
        let guard = segment.lock();

        let idx = neighborhood::probe_index(&guard, home, hkey)?;
        let offset = (idx.wrapping_sub(home)) & guard.mask();

        // SAFETY: the segment lock is held.
        let value = unsafe { guard.bucket(idx).clear() };
        guard.bucket(home).clear_hop_bit(offset as u32);
        guard.dec_len();
        value
    }

    /// Stop-the-world rebuild: take the table-wide write lock
    /// (standing in for "acquire every segment lock in ascending order"),
    /// double the segment count, and reinsert every live entry by
    /// its already-known hash (no rehashing) into the bigger table. Doubles
    /// again, without releasing the write lock, if the new table is itself
    /// too small to hold every entry.
    ///
    /// Live buckets are only ever *snapshotted* (cloned) into a candidate,
    /// never cleared, and `*write` is only ever touched once a candidate
    /// has been fully built and filled — so a failure anywhere in this
    /// function (the resize cap, or a fallible allocation) leaves the live
    /// table exactly as it was, per §7 items 1 and 5. This mirrors
    /// `CHashMap::reserve`'s own "build the replacement first, then swap"
    /// pattern rather than draining the live table in place.
    fn grow(&self, seen_generation: u64) -> Result<(), Error> {
        let mut write = self.segments.write();
        if write.generation() != seen_generation {
            // Another thread already grew the table while we waited for
            // the write lock; let the caller retry against the current one.
            return Ok(());
        }

        let mut entries = Vec::with_capacity(write.len());
        for segment in write.iter() {
            for idx in 0..segment.n_buckets() {
                let bucket = segment.bucket(idx);
                let hkey = bucket.hkey();
                if hkey != bucket::EMPTY {
                    // SAFETY: the write lock excludes every other reader
                    // and writer in the table, so this bucket cannot be
                    // touched concurrently. `snapshot` leaves the bucket
                    // untouched, so `write` is still the live, correct
                    // table if everything below this point fails.
                    if let Some(value) = unsafe { bucket.snapshot() } {
                        entries.push((hkey, value));
                    }
                }
            }
        }

        let n_buckets = write.n_buckets_per_segment();
        let next_generation = write.generation().wrapping_add(1);
        let mut n_segments = write.n_segments().saturating_mul(2);

        loop {
            if n_segments > self.params.max_segments {
                slog::warn!(
                    self.logger,
                    "resize doubling cap reached";
                    "segments" => n_segments,
                );
                return Err(Error::ResizeCapReached(n_segments));
            }

            let mut candidate = match Segments::try_new(n_segments, n_buckets) {
                Ok(candidate) => candidate,
                Err(e) => {
                    slog::warn!(self.logger, "resize allocation failed"; "segments" => n_segments);
                    return Err(e);
                }
            };
            let placed = entries.iter().all(|(hkey, value)| {
                raw_put(
                    &candidate,
                    *hkey,
                    value.clone(),
                    self.params.hop_range,
                    self.params.add_range,
                )
            });

            if placed {
                slog::info!(
                    self.logger,
                    "resized";
                    "old_segments" => write.n_segments(),
                    "new_segments" => n_segments,
                    "entries" => entries.len(),
                );
                candidate.set_generation(next_generation);
                *write = candidate;
                return Ok(());
            }

            n_segments *= 2;
        }
    }
}

/// Steps 3–6 of `put`: linear-scan for a free bucket within
/// `ADD_RANGE`, then cascade it inward via the displacement engine until it
/// lands within `HOP_RANGE`. Returns the value back on failure, so the
/// caller can retry it against a resized table.
fn insert_into_segment<V>(
    guard: &SegmentGuard<'_, V>,
    home: usize,
    hkey: u64,
    value: V,
    hop_range: u32,
    add_range: u32,
) -> Result<(), V> {
    let mask = guard.mask();

    let mut free = None;
    for d in 0..add_range as usize {
        let idx = home.wrapping_add(d) & mask;
        if guard.bucket(idx).is_empty() {
            free = Some((idx, d));
            break;
        }
    }
    let (mut free_idx, mut d) = match free {
        Some(pair) => pair,
        None => return Err(value),
    };

    loop {
        if d < hop_range as usize {
            // SAFETY: the segment lock is held.
            unsafe {
                guard.bucket(free_idx).write(hkey, value);
            }
            guard.bucket(home).set_hop_bit(d as u32);
            return Ok(());
        }

        match displacement::find_closer_free_bucket(guard, home, free_idx, d, hop_range) {
            Some((new_free_idx, new_d)) => {
                free_idx = new_free_idx;
                d = new_d;
            }
            None => return Err(value),
        }
    }
}

/// Reinsert one already-hashed entry during resize — the
/// same algorithm `put` uses, minus the hashing and the retry-via-resize
/// (a reinsertion failure here means the *candidate* table is too small,
/// not that this one entry is unplaceable; the caller discards the whole
/// candidate and tries a bigger one).
fn raw_put<V>(segments: &Segments<V>, hkey: u64, value: V, hop_range: u32, add_range: u32) -> bool {
    let segment = segments.segment(hkey);
    let home = hkey as usize & segment.mask();
    let guard = segment.lock();
    match insert_into_segment(&guard, home, hkey, value, hop_range, add_range) {
        Ok(()) => {
            guard.inc_len();
            true
        }
        Err(_value) => false,
    }
}
