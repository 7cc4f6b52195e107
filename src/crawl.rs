//! Crawl orchestration.
//!
//! Fetches report artifacts concurrently on a bounded worker pool and
//! funnels the parsed models through a channel into one merge loop, so the
//! index only ever has a single writer. Rendering and publishing happen
//! after this completes; nothing is published from a partial crawl.

use crate::aggregate::Index;
use crate::error::BuildError;
use crate::models::{BuildSummary, RecordSkip, ReportModel};
use crate::store::{DatasetRef, StoreReader};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{timeout, Instant};
use tracing::{debug, info};

/// Tuning for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Concurrent artifact fetches.
    pub concurrency: usize,
    /// Timeout for one fetch attempt.
    pub fetch_timeout: Duration,
    /// Retries after a timed-out fetch before the dataset is skipped.
    pub retries: usize,
    /// Optional overall build deadline, propagated into every fetch.
    pub deadline: Option<Duration>,
    /// Restrict the crawl to these dataset ids, when given.
    pub selector: Option<Vec<String>>,
    /// Show a progress bar while fetching.
    pub show_progress: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            fetch_timeout: Duration::from_secs(30),
            retries: 3,
            deadline: None,
            selector: None,
            show_progress: false,
        }
    }
}

/// What one fetch task reports back to the merge loop.
enum Fetched {
    Report(Box<ReportModel>),
    Skip { dataset: String, error: BuildError },
}

/// Crawl the storage roots and aggregate every discovered dataset.
///
/// Artifact-level failures (timeouts after retries, malformed artifacts)
/// become skips in the summary; only a missing storage root is fatal here.
/// Whether the skip count is acceptable is the caller's decision, against
/// its configured threshold.
pub async fn run_crawl(
    reader: StoreReader,
    config: &CrawlConfig,
) -> Result<(Index, BuildSummary), BuildError> {
    let mut refs = reader.list_datasets()?;
    if let Some(selector) = &config.selector {
        refs.retain(|r| selector.iter().any(|wanted| wanted == &r.id));
    }

    let mut summary = BuildSummary {
        datasets_discovered: refs.len(),
        built_at: Some(Utc::now()),
        ..Default::default()
    };

    info!("crawling {} dataset artifact(s)", refs.len());

    let progress = if config.show_progress {
        let bar = ProgressBar::new(refs.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let deadline = config.deadline.map(|d| Instant::now() + d);
    let reader = Arc::new(reader);
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let (tx, mut rx) = mpsc::channel::<Fetched>(config.concurrency.max(1));

    for dataset in refs {
        let reader = Arc::clone(&reader);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let config = config.clone();

        tokio::spawn(async move {
            // a closed semaphore would mean the crawl was dropped wholesale
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };

            let outcome = match fetch_one(&reader, &dataset, &config, deadline).await {
                Ok(report) => Fetched::Report(Box::new(report)),
                Err(error) => Fetched::Skip {
                    dataset: dataset.id.clone(),
                    error,
                },
            };

            let _ = tx.send(outcome).await;
        });
    }
    drop(tx);

    // Single-writer merge loop: the only place the index is mutated.
    let mut index = Index::new();
    let mut record_skips: BTreeMap<String, Vec<RecordSkip>> = BTreeMap::new();
    let mut dataset_skips: Vec<(String, String)> = Vec::new();

    while let Some(outcome) = rx.recv().await {
        progress.inc(1);
        match outcome {
            Fetched::Report(report) => {
                summary.datasets_merged += 1;
                debug!(
                    "fetched {} with {} finding(s)",
                    report.dataset.id,
                    report.finding_count()
                );
                if index.merge(&report) {
                    // keep only the winning artifact's record skips
                    record_skips.insert(report.dataset.id.clone(), report.skips.clone());
                }
            }
            Fetched::Skip { dataset, error } => {
                if error.is_fatal() {
                    return Err(error);
                }
                summary.datasets_skipped += 1;
                dataset_skips.push((dataset, error.to_string()));
            }
        }
    }
    progress.finish_and_clear();

    // Fetches complete in arbitrary order; sort the skips so the warning
    // list (and therefore the rendered summary) is reproducible.
    dataset_skips.sort();
    for (dataset, reason) in dataset_skips {
        summary.warn(format!("skipped dataset {dataset}: {reason}"));
    }

    for (dataset, skips) in record_skips {
        summary.records_skipped += skips.len();
        for skip in skips {
            summary.warn(format!(
                "skipped record in {dataset}/{}: {}",
                skip.sample, skip.reason
            ));
        }
    }
    summary.records_indexed = index.entry_count();

    info!(
        "crawl complete: {} merged, {} skipped, {} findings",
        summary.datasets_merged, summary.datasets_skipped, summary.records_indexed
    );

    Ok((index, summary))
}

/// Fetch one artifact with per-attempt timeouts and bounded retries.
///
/// The overall deadline caps each attempt's budget; once it has passed,
/// the dataset is skipped without another attempt.
async fn fetch_one(
    reader: &StoreReader,
    dataset: &DatasetRef,
    config: &CrawlConfig,
    deadline: Option<Instant>,
) -> Result<ReportModel, BuildError> {
    let mut attempts = 0;

    loop {
        let mut budget = config.fetch_timeout;
        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BuildError::FetchTimeout {
                    path: dataset.path.clone(),
                    seconds: config.fetch_timeout.as_secs(),
                });
            }
            budget = budget.min(remaining);
        }

        match timeout(budget, reader.fetch(dataset)).await {
            Ok(result) => return result,
            Err(_) => {
                attempts += 1;
                if attempts > config.retries {
                    return Err(BuildError::FetchTimeout {
                        path: dataset.path.clone(),
                        seconds: config.fetch_timeout.as_secs(),
                    });
                }
                debug!(
                    "fetch of {} timed out, retry {attempts}/{}",
                    dataset.path.display(),
                    config.retries
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn seed_store(datasets: &[(&str, &str)]) -> TempDir {
        let store = TempDir::new().unwrap();
        for (id, body) in datasets {
            let dir = store.path().join(id);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("report.json"), body).unwrap();
        }
        store
    }

    fn one_variant(dataset: &str, run: &str, sample: &str, locus: &str) -> String {
        format!(
            r#"{{"dataset": "{dataset}", "run_datetime": "{run}", "samples": {{
                "{sample}": {{"variants": [{{"locus": "{locus}", "categories": ["1"]}}]}}
            }}}}"#
        )
    }

    #[tokio::test]
    async fn test_crawl_merges_every_dataset() {
        let store = seed_store(&[
            (
                "cohort-a",
                &one_variant("cohort-a", "2025-06-01T00:00:00Z", "S1", "1-100-A-T"),
            ),
            (
                "cohort-b",
                &one_variant("cohort-b", "2025-06-02T00:00:00Z", "S2", "2-200-C-G"),
            ),
        ]);

        let reader = StoreReader::new(vec![store.path().to_path_buf()]);
        let (index, summary) = run_crawl(reader, &CrawlConfig::default()).await.unwrap();

        assert_eq!(summary.datasets_discovered, 2);
        assert_eq!(summary.datasets_merged, 2);
        assert_eq!(summary.datasets_skipped, 0);
        assert_eq!(index.entry_count(), 2);
        assert_eq!(summary.records_indexed, 2);
    }

    #[tokio::test]
    async fn test_malformed_artifact_is_a_skip_not_a_failure() {
        let store = seed_store(&[
            (
                "cohort-a",
                &one_variant("cohort-a", "2025-06-01T00:00:00Z", "S1", "1-100-A-T"),
            ),
            ("cohort-bad", "this is not json"),
        ]);

        let reader = StoreReader::new(vec![store.path().to_path_buf()]);
        let (index, summary) = run_crawl(reader, &CrawlConfig::default()).await.unwrap();

        assert_eq!(summary.datasets_merged, 1);
        assert_eq!(summary.datasets_skipped, 1);
        assert_eq!(index.entry_count(), 1);
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("cohort-bad")));
    }

    #[tokio::test]
    async fn test_record_level_skips_are_counted() {
        let store = seed_store(&[(
            "cohort-a",
            r#"{"dataset": "cohort-a", "samples": {"S1": {"variants": [
                {"locus": "1-100-A-T", "categories": ["1"]},
                {"locus": "2-200-C-G", "categories": ["1"]},
                {"categories": ["1"]}
            ]}}}"#,
        )]);

        let reader = StoreReader::new(vec![store.path().to_path_buf()]);
        let (index, summary) = run_crawl(reader, &CrawlConfig::default()).await.unwrap();

        assert_eq!(index.entry_count(), 2);
        assert_eq!(summary.records_indexed, 2);
        assert_eq!(summary.records_skipped, 1);
        assert_eq!(summary.datasets_skipped, 0);
    }

    #[tokio::test]
    async fn test_missing_root_aborts_the_crawl() {
        let reader = StoreReader::new(vec![PathBuf::from("/no/such/store")]);
        let err = run_crawl(reader, &CrawlConfig::default()).await.unwrap_err();
        assert!(matches!(err, BuildError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_dataset_resolves_to_newest_run() {
        let old_store = seed_store(&[(
            "cohort-a",
            &one_variant("cohort-a", "2025-01-01T00:00:00Z", "OLD", "1-1-A-T"),
        )]);
        let new_store = seed_store(&[(
            "cohort-a",
            &one_variant("cohort-a", "2025-06-01T00:00:00Z", "NEW", "1-1-A-T"),
        )]);

        let reader = StoreReader::new(vec![
            old_store.path().to_path_buf(),
            new_store.path().to_path_buf(),
        ]);
        let (index, summary) = run_crawl(reader, &CrawlConfig::default()).await.unwrap();

        assert_eq!(summary.datasets_discovered, 2);
        assert_eq!(index.dataset_count(), 1);
        assert_eq!(index.entries().next().unwrap().sample, "NEW");
    }

    #[tokio::test]
    async fn test_expired_deadline_skips_everything() {
        let store = seed_store(&[(
            "cohort-a",
            &one_variant("cohort-a", "2025-06-01T00:00:00Z", "S1", "1-100-A-T"),
        )]);

        let reader = StoreReader::new(vec![store.path().to_path_buf()]);
        let config = CrawlConfig {
            deadline: Some(Duration::ZERO),
            ..Default::default()
        };
        let (index, summary) = run_crawl(reader, &config).await.unwrap();

        assert_eq!(summary.datasets_skipped, 1);
        assert_eq!(summary.datasets_merged, 0);
        assert_eq!(index.entry_count(), 0);
        assert!(summary.over_threshold(0));
    }

    #[tokio::test]
    async fn test_selector_restricts_the_crawl() {
        let store = seed_store(&[
            (
                "cohort-a",
                &one_variant("cohort-a", "2025-06-01T00:00:00Z", "S1", "1-100-A-T"),
            ),
            (
                "cohort-b",
                &one_variant("cohort-b", "2025-06-02T00:00:00Z", "S2", "2-200-C-G"),
            ),
        ]);

        let reader = StoreReader::new(vec![store.path().to_path_buf()]);
        let config = CrawlConfig {
            selector: Some(vec!["cohort-b".to_string()]),
            ..Default::default()
        };
        let (index, summary) = run_crawl(reader, &config).await.unwrap();

        assert_eq!(summary.datasets_discovered, 1);
        assert_eq!(index.dataset_count(), 1);
        assert_eq!(index.entries().next().unwrap().dataset, "cohort-b");
    }

    #[tokio::test]
    async fn test_repeated_crawl_is_deterministic() {
        let store = seed_store(&[
            (
                "cohort-a",
                &one_variant("cohort-a", "2025-06-01T00:00:00Z", "S1", "1-100-A-T"),
            ),
            (
                "cohort-b",
                &one_variant("cohort-b", "2025-06-02T00:00:00Z", "S2", "2-200-C-G"),
            ),
        ]);

        let config = CrawlConfig::default();
        let (first, _) = run_crawl(
            StoreReader::new(vec![store.path().to_path_buf()]),
            &config,
        )
        .await
        .unwrap();
        let (second, _) = run_crawl(
            StoreReader::new(vec![store.path().to_path_buf()]),
            &config,
        )
        .await
        .unwrap();

        let a: Vec<_> = first.entries().collect();
        let b: Vec<_> = second.entries().collect();
        assert_eq!(a, b);
    }
}
