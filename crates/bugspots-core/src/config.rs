use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BugspotsError;
use crate::Result;

/// Commit messages matching this pattern (case-insensitively) count as fixes.
pub const DEFAULT_FIX_PATTERN: &str = r"\b(fix(es|ed)?|close(s|d)?)\b";

/// Top-level configuration loaded from `.bugspots.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use bugspots_core::BugspotsConfig;
///
/// let config = BugspotsConfig::default();
/// assert_eq!(config.scan.concurrency, 10);
/// assert_eq!(config.scan.similarity, 80);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BugspotsConfig {
    /// History scanning settings.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Report settings.
    #[serde(default)]
    pub output: OutputConfig,
}

impl BugspotsConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BugspotsError::Io`] if the file cannot be read, or
    /// [`BugspotsError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`BugspotsError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use bugspots_core::BugspotsConfig;
    ///
    /// let toml = r#"
    /// [scan]
    /// depth = 250
    /// "#;
    /// let config = BugspotsConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.scan.depth, 250);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Reject values the scanner cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`BugspotsError::Config`] naming the first offending option.
    ///
    /// # Examples
    ///
    /// ```
    /// use bugspots_core::BugspotsConfig;
    ///
    /// let mut config = BugspotsConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.scan.similarity = 120;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        self.scan.validate()
    }
}

/// History scanning configuration.
///
/// # Examples
///
/// ```
/// use bugspots_core::{ScanConfig, DEFAULT_FIX_PATTERN};
///
/// let config = ScanConfig::default();
/// assert_eq!(config.depth, 1000);
/// assert_eq!(config.pattern, DEFAULT_FIX_PATTERN);
/// assert_eq!(config.interval_ms, 3000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum number of commits to walk back from HEAD (default: 1000).
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Maximum number of diffs computed at once (default: 10).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Regex identifying fix commits, matched case-insensitively.
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Minimum rename similarity percentage to follow a rename (default: 80).
    #[serde(default = "default_similarity")]
    pub similarity: u8,
    /// Minimum milliseconds between progress reports (default: 3000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_depth() -> usize {
    1000
}

fn default_concurrency() -> usize {
    10
}

fn default_pattern() -> String {
    DEFAULT_FIX_PATTERN.into()
}

fn default_similarity() -> u8 {
    80
}

fn default_interval_ms() -> u64 {
    3000
}

impl ScanConfig {
    /// Check numeric ranges and that a fix pattern is present.
    ///
    /// The pattern itself is compiled by the engine, which reports a malformed
    /// one as [`BugspotsError::Config`] too.
    ///
    /// # Errors
    ///
    /// Returns [`BugspotsError::Config`] naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 {
            return Err(BugspotsError::Config("depth must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(BugspotsError::Config(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.similarity > 100 {
            return Err(BugspotsError::Config(format!(
                "similarity must be between 0 and 100, got {}",
                self.similarity
            )));
        }
        if self.pattern.trim().is_empty() {
            return Err(BugspotsError::Config("fix pattern is empty".into()));
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            concurrency: default_concurrency(),
            pattern: default_pattern(),
            similarity: default_similarity(),
            interval_ms: default_interval_ms(),
        }
    }
}

/// Report configuration.
///
/// # Examples
///
/// ```
/// use bugspots_core::OutputConfig;
/// use std::path::PathBuf;
///
/// let config = OutputConfig::default();
/// assert_eq!(config.file, PathBuf::from("hotspot.txt"));
/// assert!(config.limit.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the ranking is written; `-` writes to stdout.
    #[serde(default = "default_output_file")]
    pub file: PathBuf,
    /// Only render the top N entries.
    pub limit: Option<usize>,
}

fn default_output_file() -> PathBuf {
    PathBuf::from("hotspot.txt")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_output_file(),
            limit: None,
        }
    }
}
