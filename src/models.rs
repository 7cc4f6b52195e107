//! Data models for the report index builder.
//!
//! This module contains the in-memory representation of one run's findings
//! (dataset, samples, variant findings) plus the schema used to parse the
//! report artifacts emitted by the upstream categorisation engine.

use crate::error::BuildError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Phenotype-match tier of a variant finding.
///
/// Assigned upstream; this layer only carries it through to display.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum PhenotypeMatch {
    /// Gene is on a panel applied to this analysis.
    Panel,
    /// Gene matched through a cohort-level forced panel.
    Cohort,
    /// Gene matched the individual's own HPO terms.
    Hpo,
    /// No phenotype match recorded.
    #[default]
    None,
}

impl fmt::Display for PhenotypeMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhenotypeMatch::Panel => write!(f, "Panel"),
            PhenotypeMatch::Cohort => write!(f, "Cohort"),
            PhenotypeMatch::Hpo => write!(f, "HPO"),
            PhenotypeMatch::None => write!(f, "None"),
        }
    }
}

impl PhenotypeMatch {
    /// Returns the visual marker rendered next to the tier.
    pub fn marker(&self) -> &'static str {
        match self {
            PhenotypeMatch::Panel => "🔵",
            PhenotypeMatch::Cohort => "🟠",
            PhenotypeMatch::Hpo => "🟢",
            PhenotypeMatch::None => "⚪",
        }
    }
}

/// One flagged variant for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantFinding {
    /// Locus descriptor, e.g. `1-55051215-G-GA`. Identity field.
    pub locus: String,
    /// Affected gene symbol (empty when the artifact omitted it).
    pub gene: String,
    /// Mode-of-inheritance label, pre-computed upstream.
    pub moi: String,
    /// Category tags assigned by the categorisation engine. Never empty
    /// for a finding that reaches the index.
    pub categories: Vec<String>,
    /// Phenotype-match tier.
    pub pheno_match: PhenotypeMatch,
    /// Population frequency, absent when not annotated.
    pub frequency: Option<f64>,
    /// Date this variant was first tagged; absent on a first sighting
    /// without history.
    pub first_tagged: Option<NaiveDate>,
    /// Clinical-significance arbitration reference (e.g. a ClinVar VCV id).
    pub clinvar: Option<String>,
    /// Splice-effect reference.
    pub splice_ai: Option<String>,
    /// Consequence + transcript label.
    pub csq: Option<String>,
    /// Free-text support notes.
    pub support: Option<String>,
    /// Warning flags attached upstream.
    pub flags: Vec<String>,
    /// Labels applied to this variant in an external curation system.
    pub ext_labels: Vec<String>,
}

/// An individual within a dataset, with its findings in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,
    pub family: String,
    pub findings: Vec<VariantFinding>,
}

/// Descriptor of one cohort run: identity, timestamp, and the storage
/// location its artifact was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub run_datetime: Option<DateTime<Utc>>,
    pub source: PathBuf,
}

/// A record excluded during validation, kept for the build summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSkip {
    pub sample: String,
    pub reason: String,
}

/// One parsed report artifact: Dataset -> [Sample -> [VariantFinding]].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportModel {
    pub dataset: Dataset,
    pub samples: Vec<Sample>,
    /// Records dropped during validation (missing identity fields or an
    /// empty category set).
    pub skips: Vec<RecordSkip>,
}

// Raw artifact schema. Everything beyond the identity fields is optional
// and coerced to an absent sentinel rather than failing the parse.
#[derive(Debug, Deserialize)]
struct RawReport {
    dataset: String,
    #[serde(default)]
    run_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    samples: BTreeMap<String, RawSample>,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    variants: Vec<RawFinding>,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    #[serde(default)]
    locus: Option<String>,
    #[serde(default)]
    gene: Option<String>,
    #[serde(default)]
    moi: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    pheno_match: PhenotypeMatch,
    #[serde(default)]
    frequency: Option<f64>,
    #[serde(default)]
    first_tagged: Option<NaiveDate>,
    #[serde(default)]
    clinvar: Option<String>,
    #[serde(default)]
    splice_ai: Option<String>,
    #[serde(default)]
    csq: Option<String>,
    #[serde(default)]
    support: Option<String>,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    ext_labels: Vec<String>,
}

impl ReportModel {
    /// Parse one artifact into the report model.
    ///
    /// The artifact as a whole is `Malformed` when it fails to deserialise
    /// or names no dataset. Individual records failing validation are
    /// dropped and recorded in `skips`; the rest of the artifact loads.
    pub fn parse(bytes: &[u8], source: &Path) -> Result<Self, BuildError> {
        let raw: RawReport = serde_json::from_slice(bytes).map_err(|e| BuildError::Malformed {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;

        if raw.dataset.trim().is_empty() {
            return Err(BuildError::Malformed {
                path: source.to_path_buf(),
                reason: "artifact has an empty dataset id".to_string(),
            });
        }

        let mut samples = Vec::with_capacity(raw.samples.len());
        let mut skips = Vec::new();

        for (sample_id, raw_sample) in raw.samples {
            if sample_id.trim().is_empty() {
                skips.push(RecordSkip {
                    sample: sample_id,
                    reason: "empty sample id".to_string(),
                });
                continue;
            }

            let mut findings = Vec::with_capacity(raw_sample.variants.len());
            for raw_finding in raw_sample.variants {
                match validate_finding(raw_finding) {
                    Ok(finding) => findings.push(finding),
                    Err(reason) => skips.push(RecordSkip {
                        sample: sample_id.clone(),
                        reason,
                    }),
                }
            }

            samples.push(Sample {
                id: sample_id,
                family: raw_sample.family.unwrap_or_default(),
                findings,
            });
        }

        Ok(Self {
            dataset: Dataset {
                id: raw.dataset,
                run_datetime: raw.run_datetime,
                source: source.to_path_buf(),
            },
            samples,
            skips,
        })
    }

    /// Read-only traversal over every finding, preserving source order
    /// within each sample.
    pub fn findings(&self) -> impl Iterator<Item = (&Sample, &VariantFinding)> {
        self.samples
            .iter()
            .flat_map(|s| s.findings.iter().map(move |f| (s, f)))
    }

    /// Total number of findings that passed validation.
    pub fn finding_count(&self) -> usize {
        self.samples.iter().map(|s| s.findings.len()).sum()
    }
}

/// Validate one raw record, coercing optional fields and rejecting records
/// missing identity fields or carrying an empty category set.
fn validate_finding(raw: RawFinding) -> Result<VariantFinding, String> {
    let locus = match raw.locus {
        Some(l) if !l.trim().is_empty() => l,
        _ => return Err("record is missing its locus".to_string()),
    };

    if raw.categories.is_empty() {
        return Err(format!("record {locus} has an empty category set"));
    }

    Ok(VariantFinding {
        locus,
        gene: raw.gene.unwrap_or_default(),
        moi: raw.moi.unwrap_or_default(),
        categories: raw.categories,
        pheno_match: raw.pheno_match,
        frequency: raw.frequency,
        first_tagged: raw.first_tagged,
        clinvar: raw.clinvar,
        splice_ai: raw.splice_ai,
        csq: raw.csq,
        support: raw.support,
        flags: raw.flags,
        ext_labels: raw.ext_labels,
    })
}

/// Counters and warnings accumulated over one index build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Artifacts found by listing the storage roots.
    pub datasets_discovered: usize,
    /// Artifacts fetched and parsed successfully (superseded duplicates
    /// included, so merged + skipped = discovered).
    pub datasets_merged: usize,
    /// Datasets skipped (fetch timeout after retries, or malformed).
    pub datasets_skipped: usize,
    /// Findings that entered the index.
    pub records_indexed: usize,
    /// Records dropped by validation.
    pub records_skipped: usize,
    /// Build start timestamp.
    pub built_at: Option<DateTime<Utc>>,
    /// Human-readable reasons for every skip, in discovery order.
    pub warnings: Vec<String>,
}

impl BuildSummary {
    /// Record a warning: logged immediately, surfaced again in the
    /// rendered index header.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// True when dataset-level skips exceed the allowed maximum, in which
    /// case the build fails rather than publishing an incomplete index.
    pub fn over_threshold(&self, max_skips: usize) -> bool {
        self.datasets_skipped > max_skips
    }
}
