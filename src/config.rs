//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.varindex.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Crawler settings.
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Render settings.
    #[serde(default)]
    pub render: RenderConfig,
}

/// Crawl tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent artifact fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Timeout for one artifact fetch, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,

    /// Retries after a timed-out fetch.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Maximum tolerated dataset skips before the build fails.
    #[serde(default)]
    pub max_skips: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fetch_timeout_seconds: default_fetch_timeout(),
            retries: default_retries(),
            max_skips: 0,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_retries() -> usize {
    3
}

/// Render settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Render the full cross-dataset findings table on the index page.
    #[serde(default)]
    pub cohort_wide: bool,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".varindex.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Crawler settings - always override since they have defaults in CLI
        self.crawler.concurrency = args.concurrency;
        self.crawler.retries = args.retries;
        self.crawler.max_skips = args.max_skips;

        // Fetch timeout - only override if explicitly provided via CLI
        if let Some(timeout) = args.fetch_timeout {
            self.crawler.fetch_timeout_seconds = timeout;
        }

        // Flags always override
        if args.cohort_wide {
            self.render.cohort_wide = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.crawler.concurrency, 4);
        assert_eq!(config.crawler.fetch_timeout_seconds, 30);
        assert_eq!(config.crawler.max_skips, 0);
        assert!(!config.render.cohort_wide);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[crawler]
concurrency = 8
fetch_timeout_seconds = 120
max_skips = 2

[render]
cohort_wide = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.crawler.concurrency, 8);
        assert_eq!(config.crawler.fetch_timeout_seconds, 120);
        assert_eq!(config.crawler.max_skips, 2);
        assert!(config.render.cohort_wide);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[crawler]\nconcurrency = 16\n").unwrap();
        assert_eq!(config.crawler.concurrency, 16);
        assert_eq!(config.crawler.retries, 3);
        assert_eq!(config.crawler.fetch_timeout_seconds, 30);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[crawler]"));
        assert!(toml_str.contains("[render]"));
    }
}
