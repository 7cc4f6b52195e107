//! Page templates.
//!
//! Pure projections from the index model to HTML strings. Row order is
//! fixed here (the stable default sort); grouping and column sorting are
//! display-time behaviours handled by the embedded script, so the
//! underlying row data is never re-ordered after render.

use crate::aggregate::{Index, IndexEntry};
use crate::models::BuildSummary;
use crate::render::assets::{PAGE_CSS, TABLE_JS};
use maud::{html, Markup, PreEscaped, DOCTYPE};

/// Stable default ordering for findings rows: first-tagged ascending
/// (entries without a date sort first), ties broken by sample id, then by
/// locus descriptor.
pub fn sort_entries<'a>(entries: impl Iterator<Item = &'a IndexEntry>) -> Vec<&'a IndexEntry> {
    let mut rows: Vec<&IndexEntry> = entries.collect();
    rows.sort_by(|a, b| {
        a.finding
            .first_tagged
            .cmp(&b.finding.first_tagged)
            .then_with(|| a.sample.cmp(&b.sample))
            .then_with(|| a.finding.locus.cmp(&b.finding.locus))
    });
    rows
}

/// Render the top-level index: build summary, one link per discovered
/// dataset, and in cohort-wide mode the full cross-dataset findings table.
pub fn render_index(index: &Index, summary: &BuildSummary, cohort_wide: bool) -> String {
    let rows = sort_entries(index.entries());

    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            (head("Variant Report Index"))
            body {
                h1 { "Variant Report Index" }
                (summary_banner(summary))

                h2 { "Datasets" }
                @if index.dataset_count() == 0 {
                    p { "No datasets were discovered under the storage root." }
                } @else {
                    table {
                        thead {
                            tr {
                                th { "Dataset" }
                                th { "Run time" }
                                th { "Findings" }
                            }
                        }
                        tbody {
                            @for link in index.datasets() {
                                tr {
                                    td { a href=(link.page) { (link.dataset.id) } }
                                    td { (fmt_run_datetime(&link.dataset)) }
                                    td { (link.entry_count) }
                                }
                            }
                        }
                    }
                }

                @if cohort_wide {
                    h2 { "All findings" }
                    (findings_table(&rows, true))
                }

                script { (PreEscaped(TABLE_JS)) }
            }
        }
    };

    markup.into_string()
}

/// Render one dataset's findings page.
pub fn render_dataset(index: &Index, dataset_id: &str, summary: &BuildSummary) -> String {
    let rows = sort_entries(index.entries_for(dataset_id));

    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            (head(&format!("Variant Report: {dataset_id}")))
            body {
                h1 { "Variant Report: " (dataset_id) }
                p { a href="../index.html" { "Back to index" } }
                (summary_banner(summary))

                @if rows.is_empty() {
                    p { "No qualifying findings in this dataset." }
                } @else {
                    (findings_table(&rows, false))
                }

                script { (PreEscaped(TABLE_JS)) }
            }
        }
    };

    markup.into_string()
}

fn head(title: &str) -> Markup {
    html! {
        head {
            meta charset="utf-8";
            meta name="viewport" content="width=device-width, initial-scale=1";
            title { (title) }
            style { (PreEscaped(PAGE_CSS)) }
        }
    }
}

/// Processed-vs-skipped banner shown at the top of every document.
fn summary_banner(summary: &BuildSummary) -> Markup {
    html! {
        div.banner {
            // the build timestamp is deliberately absent: re-publishing an
            // unchanged set of datasets must produce byte-identical pages
            p.counts {
                (summary.datasets_merged) " of " (summary.datasets_discovered)
                " datasets merged (" (summary.datasets_skipped) " skipped), "
                (summary.records_indexed) " findings indexed ("
                (summary.records_skipped) " records skipped)"
            }
            @if !summary.warnings.is_empty() {
                details {
                    summary { (summary.warnings.len()) " warning(s)" }
                    ul {
                        @for warning in &summary.warnings {
                            li { (warning) }
                        }
                    }
                }
            }
        }
    }
}

fn findings_table(rows: &[&IndexEntry], link_source: bool) -> Markup {
    html! {
        div.table-controls {
            label {
                "Group rows by "
                select.group-select {
                    option value="none" selected { "nothing" }
                    option value="individual" { "individual" }
                    option value="family" { "family" }
                    option value="source" { "source dataset" }
                }
            }
        }
        table.findings {
            thead {
                tr {
                    th data-key="individual" { "Individual" }
                    th data-key="family" { "Family" }
                    th data-key="source" { "Source" }
                    th data-key="locus" { "Variant" }
                    th data-key="gene" { "Gene (MOI)" }
                    th data-key="tier" { "Match" }
                    th { "Categories" }
                    th data-key="freq" { "Frequency" }
                    th data-key="tagged" { "First tagged" }
                    th { "Consequence" }
                    th { "Flags" }
                }
            }
            @for entry in rows {
                (entry_tbody(entry, link_source))
            }
        }
    }
}

/// One finding: a parent row plus its collapsed detail row, wrapped in a
/// tbody so the pair sorts and toggles as a unit.
fn entry_tbody(entry: &IndexEntry, link_source: bool) -> Markup {
    let finding = &entry.finding;
    let frequency = finding
        .frequency
        .map(|f| f.to_string())
        .unwrap_or_default();
    let tagged = finding
        .first_tagged
        .map(|d| d.to_string())
        .unwrap_or_default();

    html! {
        tbody.entry
            data-individual=(entry.sample)
            data-family=(entry.family)
            data-source=(entry.dataset)
            data-locus=(finding.locus)
            data-gene=(finding.gene)
            data-tier=(finding.pheno_match)
            data-freq=(frequency)
            data-tagged=(tagged)
        {
            tr.parent {
                td { (entry.sample) }
                td { (display_or_dash(&entry.family)) }
                td {
                    @if link_source {
                        a href=(entry.page) { (entry.dataset) }
                    } @else {
                        (entry.dataset)
                    }
                }
                td.mono { (finding.locus) }
                td {
                    (display_or_dash(&finding.gene))
                    @if !finding.moi.is_empty() { " (" (finding.moi) ")" }
                }
                td { (finding.pheno_match.marker()) " " (finding.pheno_match) }
                td {
                    @for category in &finding.categories {
                        span.tag { (category) }
                    }
                }
                td { (display_or_dash(&frequency)) }
                td { (display_or_dash(&tagged)) }
                td { (display_or_dash(finding.csq.as_deref().unwrap_or_default())) }
                td {
                    @for flag in &finding.flags {
                        span.flag { (flag) }
                    }
                }
            }
            tr.detail {
                td colspan="11" { (detail_cell(entry)) }
            }
        }
    }
}

/// Additional evidence for the detail row: annotation links, external
/// labels, and the free-text support notes.
fn detail_cell(entry: &IndexEntry) -> Markup {
    let finding = &entry.finding;
    let has_detail = finding.clinvar.is_some()
        || finding.splice_ai.is_some()
        || !finding.ext_labels.is_empty()
        || finding.support.is_some();

    html! {
        @if !has_detail {
            "No additional evidence recorded."
        }
        @if let Some(clinvar) = &finding.clinvar {
            span {
                "ClinVar: "
                a href=(format!("https://www.ncbi.nlm.nih.gov/clinvar/?term={clinvar}")) {
                    (clinvar)
                }
                " "
            }
        }
        @if let Some(splice) = &finding.splice_ai {
            span { "Splice effect: " (splice) " " }
        }
        @if !finding.ext_labels.is_empty() {
            span {
                "External labels: "
                @for label in &finding.ext_labels {
                    span.tag { (label) }
                }
                " "
            }
        }
        @if let Some(support) = &finding.support {
            span { "Support: " (support) }
        }
    }
}

fn fmt_run_datetime(dataset: &crate::models::Dataset) -> String {
    dataset
        .run_datetime
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
