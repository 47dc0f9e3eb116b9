//! Construction-time configuration, validated before any allocation happens.

use crate::error::Error;

/// The width, in bits, of the `hop_info` bitmap word.
///
/// `HOP_RANGE` must fit in this; on the platforms this crate targets, a
/// 32-bit word is the practical ceiling for torn-read-free atomic loads.
pub const HOP_INFO_WIDTH: u32 = 32;

/// Tunable parameters for a [`Table`](crate::Table).
///
/// Mirrors `CHashMap::with_capacity`'s role, but exposes every tunable knob
/// of the table's shape instead of hardcoding them.
#[derive(Debug, Clone)]
pub struct Params {
    /// Number of segments. Must be a power of two.
    pub n_segments: usize,
    /// Number of buckets per segment. Must be a power of two, and at least
    /// `add_range`.
    pub n_buckets_per_segment: usize,
    /// Width of the `hop_info` bitmap / maximum distance an entry may live
    /// from its home bucket. Must be `<= HOP_INFO_WIDTH`.
    pub hop_range: u32,
    /// Maximum linear distance probed when searching for any empty bucket.
    /// Must be `>= hop_range`.
    pub add_range: u32,
    /// Upper bound on `get`'s read-path retries. Zero degrades `get` to a
    /// single-shot optimistic read that may spuriously report absent under
    /// concurrent displacement.
    pub max_tries: u32,
    /// Resize doubles `n_segments` until it would exceed this many segments,
    /// at which point the triggering operation fails with
    /// [`Error::ResizeCapReached`].
    pub max_segments: usize,
    /// Where resize/construction diagnostics are logged. Defaults to a
    /// discarding logger when left as `None`.
    pub logger: Option<slog::Logger>,
}

impl Default for Params {
    fn default() -> Params {
        Params {
            n_segments: 16,
            n_buckets_per_segment: 64,
            hop_range: 32,
            add_range: 32,
            max_tries: 8,
            max_segments: 1 << 20,
            logger: None,
        }
    }
}

impl Params {
    /// Reject misconfiguration before any allocation is attempted.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.n_segments.is_power_of_two() {
            return Err(Error::SegmentsNotPowerOfTwo(self.n_segments));
        }
        if !self.n_buckets_per_segment.is_power_of_two() {
            return Err(Error::BucketsNotPowerOfTwo(self.n_buckets_per_segment));
        }
        if self.hop_range > HOP_INFO_WIDTH {
            return Err(Error::HopRangeTooWide {
                hop_range: self.hop_range,
                bitmap_width: HOP_INFO_WIDTH,
            });
        }
        if self.hop_range > self.add_range {
            return Err(Error::HopRangeExceedsAddRange {
                hop_range: self.hop_range,
                add_range: self.add_range,
            });
        }
        if (self.n_buckets_per_segment as u64) < self.add_range as u64 {
            return Err(Error::SegmentSmallerThanAddRange {
                buckets: self.n_buckets_per_segment,
                add_range: self.add_range,
            });
        }
        Ok(())
    }

    pub(crate) fn logger(&self) -> slog::Logger {
        self.logger
            .clone()
            .unwrap_or_else(|| slog::Logger::root(slog::Discard, slog::o!()))
    }
}
