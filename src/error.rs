//! Error kinds surfaced by construction, insertion, and resize.

use thiserror::Error;

/// Everything that can go wrong building or growing a [`Table`](crate::Table).
///
/// There are no transient errors on the read path: `get` always terminates with
/// a value or "absent", never an `Err`.
#[derive(Debug, Error)]
pub enum Error {
    /// `N_SEGMENTS` was not a power of two.
    #[error("segment count {0} is not a power of two")]
    SegmentsNotPowerOfTwo(usize),
    /// `N_BUCKETS_PER_SEGMENT` was not a power of two.
    #[error("buckets per segment {0} is not a power of two")]
    BucketsNotPowerOfTwo(usize),
    /// `HOP_RANGE` exceeds the bitmap's word width.
    #[error("hop range {hop_range} exceeds the {bitmap_width}-bit hop_info word")]
    HopRangeTooWide {
        hop_range: u32,
        bitmap_width: u32,
    },
    /// `HOP_RANGE` exceeds `ADD_RANGE`.
    #[error("hop range {hop_range} exceeds add range {add_range}")]
    HopRangeExceedsAddRange {
        hop_range: u32,
        add_range: u32,
    },
    /// `N_BUCKETS_PER_SEGMENT` is smaller than `ADD_RANGE`, so a segment could
    /// never hold a full linear scan.
    #[error("buckets per segment {buckets} is smaller than add range {add_range}")]
    SegmentSmallerThanAddRange {
        buckets: usize,
        add_range: u32,
    },
    /// The allocator could not satisfy a request, during construction or resize.
    #[error("allocation failed while {0}")]
    Alloc(&'static str),
    /// Resize would have to double past the configured cap.
    #[error("resize doubling cap reached at {0} segments")]
    ResizeCapReached(usize),
}
