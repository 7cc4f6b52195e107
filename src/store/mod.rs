//! Content store access.
//!
//! This module provides the report store reader (dataset discovery and
//! artifact fetching) and the index publisher (atomic page writes).

pub mod publisher;
pub mod reader;

pub use publisher::{Page, Publisher};
pub use reader::{DatasetRef, StoreReader, REPORT_FILE};
