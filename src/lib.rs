#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Decoding a bucket's run from its boundary markers.
pub mod bounds;

mod error;

/// A HashMap backed by the arrow table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a key-value map interface with configurable hashers.
pub mod hash_map;

/// The raw arrow table, keyed by caller-supplied hashes.
pub mod hash_table;

mod slot_store;

#[cfg(all(test, feature = "std"))]
mod proptests;

pub use bounds::Bounds;
pub use error::Error;
pub use error::Result;
#[cfg(feature = "foldhash")]
pub use hash_map::DefaultHashBuilder;
pub use hash_map::HashMap;
pub use hash_table::CellRecord;
pub use hash_table::HashTable;
pub use hash_table::InsertOutcome;
pub use hash_table::RemoveOutcome;
pub use slot_store::Arrow;

/// Capacity allocated by the first insertion into an unallocated table.
pub const DEFAULT_CAPACITY: usize = 8;

cfg_if::cfg_if! {
    if #[cfg(feature = "density-eighty")] {
        /// Load factor, as `(numerator, denominator)`, that an insertion may
        /// not reach without growing the table first.
        pub const GROWTH_THRESHOLD: (u64, u64) = (4, 5);
    } else if #[cfg(feature = "density-eighty-five")] {
        /// Load factor, as `(numerator, denominator)`, that an insertion may
        /// not reach without growing the table first.
        pub const GROWTH_THRESHOLD: (u64, u64) = (17, 20);
    } else {
        /// Load factor, as `(numerator, denominator)`, that an insertion may
        /// not reach without growing the table first.
        pub const GROWTH_THRESHOLD: (u64, u64) = (9, 10);
    }
}
