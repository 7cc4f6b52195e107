//! HTML rendering.
//!
//! Projects the aggregated index (or a single dataset's slice of it) into
//! self-contained HTML documents: a top-level index page plus one findings
//! page per dataset.

pub mod assets;
pub mod page;

pub use page::{render_dataset, render_index, sort_entries};
