/// Errors that can occur while scanning a repository for hotspots.
///
/// Library crates use this type directly; it derives [`miette::Diagnostic`]
/// so the binary can surface it with `?`.
///
/// # Examples
///
/// ```
/// use bugspots_core::BugspotsError;
///
/// let err = BugspotsError::Config("concurrency must be at least 1".into());
/// assert!(err.to_string().contains("concurrency"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum BugspotsError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(bugspots::io))]
    Io(#[from] std::io::Error),

    /// Invalid option value or malformed fix pattern.
    #[error("configuration error: {0}")]
    #[diagnostic(code(bugspots::config))]
    Config(String),

    /// Listing commits or diffing two commits failed.
    #[error("git error: {0}")]
    #[diagnostic(
        code(bugspots::git),
        help("run bugspots from inside a git repository, or pass --dir")
    )]
    Git(String),

    /// A concurrent diff task panicked or was cancelled.
    #[error("scan task failed: {0}")]
    #[diagnostic(code(bugspots::task))]
    Task(String),

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(bugspots::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(bugspots::toml))]
    Toml(#[from] toml::de::Error),
}
