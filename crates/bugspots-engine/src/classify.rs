//! Decide whether a commit message denotes a bug fix.

use bugspots_core::{BugspotsError, Result, DEFAULT_FIX_PATTERN};
use regex::{Regex, RegexBuilder};

/// Matches commit messages against a case-insensitive fix pattern.
///
/// # Examples
///
/// ```
/// use bugspots_engine::classify::FixClassifier;
///
/// let classifier = FixClassifier::default();
/// assert!(classifier.is_fix("Fixes #42: crash on empty input"));
/// assert!(!classifier.is_fix("prefix handling for paths"));
/// ```
#[derive(Debug, Clone)]
pub struct FixClassifier {
    pattern: Regex,
}

impl FixClassifier {
    /// Compile `pattern` for case-insensitive matching.
    ///
    /// # Errors
    ///
    /// Returns [`BugspotsError::Config`] if the pattern is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| BugspotsError::Config(format!("invalid fix pattern: {e}")))?;
        Ok(Self { pattern })
    }

    /// Whether `message` matches the fix pattern.
    pub fn is_fix(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Default for FixClassifier {
    fn default() -> Self {
        Self {
            pattern: RegexBuilder::new(DEFAULT_FIX_PATTERN)
                .case_insensitive(true)
                .build()
                .unwrap_or_else(|e| unreachable!("default fix pattern is valid: {e}")),
        }
    }
}
