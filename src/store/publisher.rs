//! Index publisher.
//!
//! Writes rendered documents to fixed, predictable paths under the output
//! root. Each write goes to a temp file in the destination directory and is
//! renamed over the target, so a failed publish leaves the prior version
//! untouched.

use crate::error::BuildError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// A publishable page. The path is a pure function of the page kind and
/// dataset id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page<'a> {
    /// Top-level index document.
    Index,
    /// Per-dataset findings page.
    Dataset(&'a str),
}

impl Page<'_> {
    /// Path of this page relative to the output root.
    pub fn rel_path(&self) -> PathBuf {
        match self {
            Page::Index => PathBuf::from("index.html"),
            Page::Dataset(id) => Path::new(id).join("index.html"),
        }
    }

    /// URL-style href of this page relative to the output root, for links
    /// between published documents.
    pub fn href(&self) -> String {
        match self {
            Page::Index => "index.html".to_string(),
            Page::Dataset(id) => format!("{id}/index.html"),
        }
    }
}

/// Publisher for one output root.
pub struct Publisher {
    output_root: PathBuf,
}

impl Publisher {
    pub fn new(output_root: PathBuf) -> Self {
        Self { output_root }
    }

    /// Absolute path a page will be published at.
    pub fn target(&self, page: Page<'_>) -> PathBuf {
        self.output_root.join(page.rel_path())
    }

    /// Publish one page, overwriting any prior version at that path.
    ///
    /// Idempotent: republishing identical content yields an identical file.
    pub fn publish(&self, page: Page<'_>, content: &str) -> Result<PathBuf, BuildError> {
        let target = self.target(page);
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.output_root.clone());

        std::fs::create_dir_all(&parent).map_err(|source| BuildError::WriteError {
            path: parent.clone(),
            source,
        })?;

        // temp file in the destination directory, so persist() is a rename
        let mut tmp = NamedTempFile::new_in(&parent).map_err(|source| BuildError::WriteError {
            path: target.clone(),
            source,
        })?;
        tmp.write_all(content.as_bytes())
            .map_err(|source| BuildError::WriteError {
                path: target.clone(),
                source,
            })?;
        tmp.persist(&target).map_err(|e| BuildError::WriteError {
            path: target.clone(),
            source: e.error,
        })?;

        info!("published {}", target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_page_paths_are_fixed() {
        assert_eq!(Page::Index.rel_path(), PathBuf::from("index.html"));
        assert_eq!(
            Page::Dataset("cohort-a").rel_path(),
            PathBuf::from("cohort-a/index.html")
        );
        assert_eq!(Page::Dataset("cohort-a").href(), "cohort-a/index.html");
    }

    #[test]
    fn test_publish_creates_directories() {
        let out = TempDir::new().unwrap();
        let publisher = Publisher::new(out.path().to_path_buf());

        let path = publisher
            .publish(Page::Dataset("cohort-a"), "<html></html>")
            .unwrap();

        assert_eq!(path, out.path().join("cohort-a/index.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), "<html></html>");
    }

    #[test]
    fn test_publish_replaces_prior_version() {
        let out = TempDir::new().unwrap();
        let publisher = Publisher::new(out.path().to_path_buf());

        publisher.publish(Page::Index, "first").unwrap();
        publisher.publish(Page::Index, "second").unwrap();

        let target = out.path().join("index.html");
        assert_eq!(fs::read_to_string(target).unwrap(), "second");
    }

    #[test]
    fn test_publish_leaves_no_temp_files() {
        let out = TempDir::new().unwrap();
        let publisher = Publisher::new(out.path().to_path_buf());

        publisher.publish(Page::Index, "content").unwrap();

        let entries: Vec<String> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["index.html".to_string()]);
    }

    #[test]
    fn test_unwritable_destination_is_write_error() {
        let out = TempDir::new().unwrap();
        // occupy the dataset directory path with a plain file
        fs::write(out.path().join("cohort-a"), "in the way").unwrap();

        let publisher = Publisher::new(out.path().to_path_buf());
        let err = publisher
            .publish(Page::Dataset("cohort-a"), "content")
            .unwrap_err();

        assert!(matches!(err, BuildError::WriteError { .. }));
        assert!(err.is_fatal());
    }
}
