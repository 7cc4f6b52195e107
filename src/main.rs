//! VarIndex - Variant Report Index Builder
//!
//! A CLI tool that crawls per-cohort variant report artifacts from one or
//! more storage roots, aggregates them into a single deduplicated index,
//! and publishes browsable HTML pages back to a content store.
//!
//! Exit codes:
//!   0 - Success (including skips at or below the threshold)
//!   1 - Runtime error (missing storage root, failed publish, bad config)
//!   2 - Skip threshold exceeded (index intentionally not published)

mod aggregate;
mod cli;
mod config;
mod crawl;
mod error;
mod models;
mod render;
mod store;

use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use crawl::CrawlConfig;
use std::time::Duration;
use store::{Page, Publisher, StoreReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("VarIndex v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the build
    match run_build(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Build failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .varindex.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".varindex.toml");

    if path.exists() {
        eprintln!("⚠️  .varindex.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .varindex.toml")?;

    println!("✅ Created .varindex.toml with default settings.");
    println!("   Edit it to customize concurrency, timeouts, and render options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete build workflow. Returns exit code (0 or 2).
async fn run_build(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let reader = StoreReader::new(args.store.clone());

    // Handle --dry-run: list datasets and exit
    if args.dry_run {
        return handle_dry_run(&reader, &args);
    }

    let output_root = args
        .output
        .clone()
        .context("An --output root is required")?;

    // Step 1: Crawl the storage roots and aggregate
    println!("🔎 Crawling {} storage root(s)...", args.store.len());
    let crawl_config = CrawlConfig {
        concurrency: config.crawler.concurrency,
        fetch_timeout: Duration::from_secs(config.crawler.fetch_timeout_seconds),
        retries: config.crawler.retries,
        deadline: args.deadline_secs.map(Duration::from_secs),
        selector: args.datasets.clone(),
        show_progress: !args.quiet,
    };
    let (index, summary) = crawl::run_crawl(reader, &crawl_config).await?;

    // Step 2: Threshold gate, before anything is published
    if summary.over_threshold(config.crawler.max_skips) {
        eprintln!(
            "\n⛔ {} dataset(s) skipped, above the allowed {}. Not publishing (exit code 2).",
            summary.datasets_skipped, config.crawler.max_skips
        );
        return Ok(2);
    }

    // Step 3: Render and publish every page
    println!("📝 Rendering and publishing index...");
    let publisher = Publisher::new(output_root);

    let index_html = render::render_index(&index, &summary, config.render.cohort_wide);
    publisher.publish(Page::Index, &index_html)?;

    for link in index.datasets() {
        let html = render::render_dataset(&index, &link.dataset.id, &summary);
        publisher.publish(Page::Dataset(&link.dataset.id), &html)?;
    }

    // Print summary
    println!("\n📊 Build Summary:");
    if let Some(built_at) = summary.built_at {
        println!("   Started: {}", built_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!(
        "   Datasets: {} merged, {} skipped (of {} discovered)",
        summary.datasets_merged, summary.datasets_skipped, summary.datasets_discovered
    );
    println!(
        "   Findings: {} indexed, {} records skipped",
        summary.records_indexed, summary.records_skipped
    );
    if !summary.warnings.is_empty() {
        println!(
            "   ⚠️  {} warning(s), listed in the published index",
            summary.warnings.len()
        );
    }
    println!(
        "\n✅ Index published to: {}",
        publisher.target(Page::Index).display()
    );

    Ok(0)
}

/// Handle --dry-run: list discovered datasets, print them, exit.
fn handle_dry_run(reader: &StoreReader, args: &Args) -> Result<i32> {
    println!("\n🔍 Dry run: listing datasets (nothing is fetched or published)...\n");

    let mut refs = reader.list_datasets()?;
    if let Some(selector) = &args.datasets {
        refs.retain(|r| selector.iter().any(|wanted| wanted == &r.id));
    }

    if refs.is_empty() {
        println!("   No dataset artifacts found.");
    } else {
        println!("   Found {} dataset artifact(s):\n", refs.len());
        for dataset in &refs {
            println!("     📄 {} ({})", dataset.id, dataset.path.display());
        }
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .varindex.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
