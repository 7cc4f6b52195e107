//! The consolidated variant index.
//!
//! The index is an explicit value threaded through the build: the reader
//! produces report models, `Index::merge` folds them in one at a time, and
//! the renderer/publisher consume the finished value. Merge order does not
//! affect the final state; ordering for display is applied at render time
//! only.

use crate::models::{Dataset, ReportModel, VariantFinding};
use crate::store::Page;
use std::collections::BTreeMap;
use tracing::debug;

/// Identity of one index entry.
///
/// Entries are uniquely keyed by (dataset id, sample id, locus), which is
/// what makes re-aggregation replace rather than duplicate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryKey {
    pub dataset: String,
    pub sample: String,
    pub locus: String,
}

/// A (dataset, sample, finding) triple plus the link back to the
/// originating per-dataset page.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub dataset: String,
    pub sample: String,
    pub family: String,
    pub finding: VariantFinding,
    /// Href of the per-dataset page, relative to the output root.
    pub page: String,
}

impl IndexEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            dataset: self.dataset.clone(),
            sample: self.sample.clone(),
            locus: self.finding.locus.clone(),
        }
    }
}

/// Link from the top-level index to one dataset page. Registered even when
/// the dataset contributed no entries.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLink {
    pub dataset: Dataset,
    pub entry_count: usize,
    pub page: String,
}

/// The aggregated, deduplicated set of index entries across all datasets.
#[derive(Debug, Clone, Default)]
pub struct Index {
    entries: BTreeMap<EntryKey, IndexEntry>,
    datasets: BTreeMap<String, DatasetLink>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one report into the index, superseding by dataset identity:
    /// all prior entries for the dataset id are removed before the new
    /// entries are inserted.
    ///
    /// Duplicate discoveries of one dataset id resolve to the most recent
    /// run timestamp, ties broken lexicographically by storage path; a
    /// stale duplicate is ignored and `false` is returned. Merging the
    /// same artifact again is a no-op on the final state.
    pub fn merge(&mut self, report: &ReportModel) -> bool {
        let incoming = &report.dataset;

        if let Some(existing) = self.datasets.get(&incoming.id) {
            if !supersedes(incoming, &existing.dataset) {
                debug!(
                    "ignoring stale duplicate of dataset {} from {}",
                    incoming.id,
                    incoming.source.display()
                );
                return false;
            }
        }

        self.entries.retain(|key, _| key.dataset != incoming.id);

        let page = Page::Dataset(&incoming.id).href();
        let mut entry_count = 0;
        for (sample, finding) in report.findings() {
            let entry = IndexEntry {
                dataset: incoming.id.clone(),
                sample: sample.id.clone(),
                family: sample.family.clone(),
                finding: finding.clone(),
                page: page.clone(),
            };
            self.entries.insert(entry.key(), entry);
            entry_count += 1;
        }

        self.datasets.insert(
            incoming.id.clone(),
            DatasetLink {
                dataset: incoming.clone(),
                entry_count,
                page,
            },
        );

        true
    }

    /// All entries, in key order. Display ordering is the renderer's job.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Entries belonging to one dataset.
    pub fn entries_for<'a>(&'a self, dataset_id: &'a str) -> impl Iterator<Item = &'a IndexEntry> + 'a {
        self.entries
            .values()
            .filter(move |entry| entry.dataset == dataset_id)
    }

    /// Registered dataset links, in id order.
    pub fn datasets(&self) -> impl Iterator<Item = &DatasetLink> {
        self.datasets.values()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn dataset_count(&self) -> usize {
        self.datasets.len()
    }
}

/// Precedence for duplicate dataset discoveries: run timestamp first
/// (absent sorts lowest), then storage path. Equal precedence replaces,
/// which is what makes a rebuild of the same artifact idempotent.
fn supersedes(incoming: &Dataset, existing: &Dataset) -> bool {
    (incoming.run_datetime, &incoming.source) >= (existing.run_datetime, &existing.source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportModel;
    use std::path::Path;

    fn report(dataset: &str, run: &str, source: &str, loci: &[(&str, &str)]) -> ReportModel {
        let mut samples = String::new();
        for (i, (sample, locus)) in loci.iter().enumerate() {
            if i > 0 {
                samples.push(',');
            }
            samples.push_str(&format!(
                r#""{sample}": {{"family": "FAM-{sample}", "variants": [
                    {{"locus": "{locus}", "gene": "G1", "categories": ["1"]}}
                ]}}"#
            ));
        }
        let body = format!(
            r#"{{"dataset": "{dataset}", "run_datetime": "{run}", "samples": {{{samples}}}}}"#
        );
        ReportModel::parse(body.as_bytes(), Path::new(source)).unwrap()
    }

    #[test]
    fn test_merge_inserts_entries_and_link() {
        let mut index = Index::new();
        let merged = index.merge(&report(
            "cohort-a",
            "2025-06-01T00:00:00Z",
            "store/cohort-a/report.json",
            &[("S1", "1-100-A-T"), ("S2", "2-200-C-G")],
        ));

        assert!(merged);
        assert_eq!(index.entry_count(), 2);
        assert_eq!(index.dataset_count(), 1);

        let link = index.datasets().next().unwrap();
        assert_eq!(link.entry_count, 2);
        assert_eq!(link.page, "cohort-a/index.html");
    }

    #[test]
    fn test_remerge_supersedes_without_duplicates() {
        let mut index = Index::new();
        index.merge(&report(
            "cohort-a",
            "2025-06-01T00:00:00Z",
            "store/cohort-a/report.json",
            &[("S1", "1-100-A-T"), ("S2", "2-200-C-G")],
        ));

        // second run of the same dataset: one record replaced, one dropped
        index.merge(&report(
            "cohort-a",
            "2025-07-01T00:00:00Z",
            "store/cohort-a/report.json",
            &[("S1", "1-100-A-T"), ("S3", "3-300-G-A")],
        ));

        assert_eq!(index.entry_count(), 2);
        let samples: Vec<&str> = index.entries().map(|e| e.sample.as_str()).collect();
        assert_eq!(samples, vec!["S1", "S3"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let make = || {
            report(
                "cohort-a",
                "2025-06-01T00:00:00Z",
                "store/cohort-a/report.json",
                &[("S1", "1-100-A-T")],
            )
        };

        let mut once = Index::new();
        once.merge(&make());

        let mut twice = Index::new();
        twice.merge(&make());
        twice.merge(&make());

        let a: Vec<&IndexEntry> = once.entries().collect();
        let b: Vec<&IndexEntry> = twice.entries().collect();
        assert_eq!(a, b);
        assert_eq!(once.dataset_count(), twice.dataset_count());
    }

    #[test]
    fn test_zero_finding_dataset_still_registers_link() {
        let body = r#"{"dataset": "quiet", "samples": {}}"#;
        let quiet = ReportModel::parse(body.as_bytes(), Path::new("store/quiet/report.json"))
            .unwrap();

        let mut index = Index::new();
        assert!(index.merge(&quiet));

        assert_eq!(index.entry_count(), 0);
        assert_eq!(index.dataset_count(), 1);
        assert_eq!(index.datasets().next().unwrap().entry_count, 0);
    }

    #[test]
    fn test_stale_duplicate_is_ignored() {
        let newer = report(
            "cohort-a",
            "2025-07-01T00:00:00Z",
            "main/cohort-a/report.json",
            &[("S1", "1-100-A-T")],
        );
        let older = report(
            "cohort-a",
            "2025-06-01T00:00:00Z",
            "archive/cohort-a/report.json",
            &[("S9", "9-900-A-T")],
        );

        // arrival order must not matter
        let mut index = Index::new();
        assert!(index.merge(&newer));
        assert!(!index.merge(&older));
        assert_eq!(index.entries().next().unwrap().sample, "S1");

        let mut index = Index::new();
        assert!(index.merge(&older));
        assert!(index.merge(&newer));
        assert_eq!(index.entries().next().unwrap().sample, "S1");
    }

    #[test]
    fn test_duplicate_timestamp_tie_breaks_on_path() {
        let low_path = report(
            "cohort-a",
            "2025-06-01T00:00:00Z",
            "a-store/cohort-a/report.json",
            &[("S1", "1-100-A-T")],
        );
        let high_path = report(
            "cohort-a",
            "2025-06-01T00:00:00Z",
            "b-store/cohort-a/report.json",
            &[("S2", "2-200-C-G")],
        );

        let mut index = Index::new();
        index.merge(&high_path);
        index.merge(&low_path);
        assert_eq!(index.entries().next().unwrap().sample, "S2");

        let mut index = Index::new();
        index.merge(&low_path);
        index.merge(&high_path);
        assert_eq!(index.entries().next().unwrap().sample, "S2");
    }

    #[test]
    fn test_entries_for_filters_by_dataset() {
        let mut index = Index::new();
        index.merge(&report(
            "cohort-a",
            "2025-06-01T00:00:00Z",
            "store/cohort-a/report.json",
            &[("S1", "1-100-A-T")],
        ));
        index.merge(&report(
            "cohort-b",
            "2025-06-01T00:00:00Z",
            "store/cohort-b/report.json",
            &[("S2", "2-200-C-G")],
        ));

        assert_eq!(index.entries_for("cohort-a").count(), 1);
        assert_eq!(index.entries_for("cohort-b").count(), 1);
        assert_eq!(index.entry_count(), 2);
    }
}
