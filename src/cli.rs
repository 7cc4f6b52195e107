//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// VarIndex - consolidated index builder for variant report artifacts
///
/// Crawls one or more storage roots for per-dataset variant reports,
/// merges them into a single deduplicated index, and publishes browsable
/// HTML pages to the output root.
///
/// Examples:
///   varindex --store /data/reports --output /data/web
///   varindex --store main,archive --output ./site --cohort-wide
///   varindex --store /data/reports --output ./site --datasets cohort-a
///   varindex --store /data/reports --output ./site --dry-run
///   varindex --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Storage root(s) holding per-dataset report artifacts
    ///
    /// Layout: <root>/<dataset>/report.json. May be given more than once
    /// (or comma-separated); duplicate dataset ids across roots resolve
    /// to the most recent run.
    #[arg(
        short,
        long,
        value_name = "DIR",
        value_delimiter = ',',
        required_unless_present = "init_config"
    )]
    pub store: Vec<PathBuf>,

    /// Output root the index is published under
    #[arg(
        short,
        long,
        value_name = "DIR",
        required_unless_present = "init_config"
    )]
    pub output: Option<PathBuf>,

    /// Restrict the build to specific dataset ids (comma-separated)
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub datasets: Option<Vec<String>>,

    /// Also render the full cross-dataset findings table on the index page
    #[arg(long)]
    pub cohort_wide: bool,

    /// Number of concurrent artifact fetches
    #[arg(long, default_value = "4", value_name = "NUM")]
    pub concurrency: usize,

    /// Timeout for a single artifact fetch, in seconds
    #[arg(long, value_name = "SECS")]
    pub fetch_timeout: Option<u64>,

    /// Retries after a timed-out fetch before the dataset is skipped
    #[arg(long, default_value = "3", value_name = "NUM")]
    pub retries: usize,

    /// Maximum tolerated dataset skips before the build fails
    ///
    /// A build with more skips than this publishes nothing and exits with
    /// code 2, so an incomplete index is never silently published.
    #[arg(long, default_value = "0", env = "VARINDEX_MAX_SKIPS", value_name = "NUM")]
    pub max_skips: usize,

    /// Overall build deadline in seconds
    ///
    /// Propagated into every fetch; once expired, outstanding fetches are
    /// treated as skips.
    #[arg(long, value_name = "SECS")]
    pub deadline_secs: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .varindex.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list discovered datasets without fetching or publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .varindex.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.store.is_empty() {
            return Err("At least one --store root is required".to_string());
        }

        if self.output.is_none() {
            return Err("An --output root is required".to_string());
        }

        if self.concurrency == 0 {
            return Err("Concurrency must be at least 1".to_string());
        }

        if let Some(timeout) = self.fetch_timeout {
            if timeout == 0 {
                return Err("Fetch timeout must be at least 1 second".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            store: vec![PathBuf::from("/data/reports")],
            output: Some(PathBuf::from("/data/web")),
            datasets: None,
            cohort_wide: false,
            concurrency: 4,
            fetch_timeout: None,
            retries: 3,
            max_skips: 0,
            deadline_secs: None,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args_pass() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_requires_store_and_output() {
        let mut args = make_args();
        args.store.clear();
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.output = None;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_concurrency() {
        let mut args = make_args();
        args.concurrency = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.store.clear();
        args.output = None;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
