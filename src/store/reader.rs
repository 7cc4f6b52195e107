//! Report store reader.
//!
//! Lists per-dataset report artifacts under one or more storage roots and
//! fetches them as parsed report models. Listing is cheap and restartable;
//! fetching is async so the crawl can run fetches concurrently.

use crate::error::BuildError;
use crate::models::ReportModel;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Artifact file name inside each dataset directory.
pub const REPORT_FILE: &str = "report.json";

/// A discovered dataset artifact, prior to fetching.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DatasetRef {
    /// Dataset id, taken from the directory name.
    pub id: String,
    /// Full path of the report artifact.
    pub path: PathBuf,
}

/// Reader over the content store layout `<root>/<dataset>/report.json`.
pub struct StoreReader {
    roots: Vec<PathBuf>,
}

impl StoreReader {
    /// Create a reader over one or more storage roots.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// List every dataset artifact under the storage roots.
    ///
    /// Returns descriptors sorted by path so repeated listings are
    /// reproducible. Fails with `NotFound` when a root is unreachable.
    /// Duplicate dataset ids (same id under two paths) are returned as-is;
    /// the aggregator resolves them by run timestamp.
    pub fn list_datasets(&self) -> Result<Vec<DatasetRef>, BuildError> {
        let mut refs = Vec::new();

        for root in &self.roots {
            if !root.is_dir() {
                return Err(BuildError::NotFound(root.clone()));
            }

            for entry in WalkDir::new(root)
                .min_depth(2)
                .max_depth(2)
                .sort_by_file_name()
            {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        debug!("skipping unreadable store entry: {e}");
                        continue;
                    }
                };

                if !entry.file_type().is_file() || entry.file_name() != REPORT_FILE {
                    continue;
                }

                let Some(id) = dataset_id_of(entry.path()) else {
                    continue;
                };

                refs.push(DatasetRef {
                    id,
                    path: entry.path().to_path_buf(),
                });
            }
        }

        refs.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("listed {} dataset artifact(s)", refs.len());
        Ok(refs)
    }

    /// Fetch and parse one artifact.
    ///
    /// An artifact that vanished between listing and fetching, or that
    /// cannot be read, is reported as `Malformed` so the crawl records a
    /// skip rather than aborting.
    pub async fn fetch(&self, dataset: &DatasetRef) -> Result<ReportModel, BuildError> {
        let bytes = tokio::fs::read(&dataset.path)
            .await
            .map_err(|e| BuildError::Malformed {
                path: dataset.path.clone(),
                reason: format!("unreadable artifact: {e}"),
            })?;

        ReportModel::parse(&bytes, &dataset.path)
    }
}

/// The dataset id is the name of the directory holding the artifact.
fn dataset_id_of(artifact: &Path) -> Option<String> {
    artifact
        .parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().to_string())
}
