//! Index aggregation.
//!
//! Merges parsed report models into the consolidated index.

pub mod index;

pub use index::{DatasetLink, EntryKey, Index, IndexEntry};
