//! Concurrent hash maps, hopscotch-hashing edition.
//!
//! This crate implements a concurrent associative array based on the
//! hopscotch hashing scheme of Herlihy, Shavit and Tzafrir (2008): a hash
//! table is split into fixed-size *segments*, each segment is protected by
//! its own lock, and every live entry is kept within a bounded
//! `hop_info`-bitmap neighborhood of its home bucket so that a lookup never
//! has to do more than inspect that bitmap's set bits. Lookups take no
//! lock at all — they use a per-segment timestamp to detect (and retry
//! past) a concurrent displacement.
//!
//! The API is a smaller surface than `chashmap`'s (no `upsert`/`alter`/
//! `retain`, no iteration): this crate stores only a key's 64-bit hash, not
//! the key itself, and its reads clone values out rather than handing back
//! a lock guard. See `DESIGN.md` for how those choices were reached.
//!
//! ```
//! use hopscotch_map::Table;
//!
//! let table: Table<u64, &str> = Table::new().unwrap();
//! table.put(1, "a").unwrap();
//! assert_eq!(table.get(&1), Some("a"));
//! assert_eq!(table.remove(&1), Some("a"));
//! assert_eq!(table.get(&1), None);
//! ```

mod bucket;
mod displacement;
mod error;
mod hash;
mod neighborhood;
mod params;
mod segment;
mod segments;
mod sync;
mod table;

#[cfg(test)]
mod tests;


pub use error::Error;
pub use params::Params;
pub use table::Table;
