//! Version-control access: commit listing via git2, diffs via `git diff`.
//!
//! The engine only talks to history through [`VersionControl`], so tests can
//! substitute an in-memory source for a real repository.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;

use bugspots_core::{BugspotsError, Result};
use chrono::{DateTime, Utc};
use git2::{ErrorCode, Repository, Sort};

/// A commit as seen by the scanner.
///
/// # Examples
///
/// ```
/// use bugspots_engine::vcs::Commit;
/// use chrono::{TimeZone, Utc};
///
/// let commit = Commit {
///     hash: "9fceb02".into(),
///     timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
///     message: "fix: off-by-one in pager".into(),
/// };
/// assert_eq!(commit.hash, "9fceb02");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Full commit hash.
    pub hash: String,
    /// Author time of the commit.
    pub timestamp: DateTime<Utc>,
    /// First line of the commit message.
    pub message: String,
}

/// One file change in the diff between two commits.
///
/// # Examples
///
/// ```
/// use bugspots_engine::vcs::ChangeRecord;
///
/// let rename = ChangeRecord::Renamed {
///     from: "src/old.rs".into(),
///     to: "src/new.rs".into(),
///     similarity: 92,
/// };
/// assert_eq!(rename.source_path(), "src/old.rs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord {
    /// New file.
    Added(String),
    /// Existing file modified.
    Modified(String),
    /// File removed.
    Deleted(String),
    /// File moved, with the similarity percentage reported by git.
    Renamed {
        /// Path on the older side of the diff.
        from: String,
        /// Path on the newer side of the diff.
        to: String,
        /// Similarity index, 0–100.
        similarity: u8,
    },
}

impl ChangeRecord {
    /// The path on the older side of the change.
    pub fn source_path(&self) -> &str {
        match self {
            ChangeRecord::Added(path)
            | ChangeRecord::Modified(path)
            | ChangeRecord::Deleted(path) => path,
            ChangeRecord::Renamed { from, .. } => from,
        }
    }
}

/// Access to repository history.
///
/// Implementations must be shareable across the scanner's worker threads;
/// each call may run concurrently with others.
pub trait VersionControl: Send + Sync + 'static {
    /// List up to `depth` commits reachable from HEAD, newest first.
    ///
    /// An empty history yields an empty list.
    fn list_commits(&self, depth: usize) -> Result<Vec<Commit>>;

    /// Changes that turn `old` into `new`.
    fn diff(&self, old: &str, new: &str) -> Result<Vec<ChangeRecord>>;
}

/// A git repository on disk.
///
/// Commits are read with git2; diffs shell out to `git diff --name-status`
/// because that reports rename similarity.
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
    rename_detection: u8,
}

impl GitRepository {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BugspotsError::Git`] if `path` is not inside a git repository.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|e| {
            BugspotsError::Git(format!(
                "failed to open repository at {}: {e}",
                path.display()
            ))
        })?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo.path().to_path_buf());
        Ok(Self {
            root,
            rename_detection: 50,
        })
    }

    /// Similarity percentage git uses when pairing deletes with adds
    /// (default: 50, git's own default).
    pub fn with_rename_detection(mut self, percent: u8) -> Self {
        self.rename_detection = percent.min(100);
        self
    }

    /// Working directory root of the repository.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl VersionControl for GitRepository {
    fn list_commits(&self, depth: usize) -> Result<Vec<Commit>> {
        let repo = Repository::open(&self.root)
            .map_err(|e| BugspotsError::Git(format!("failed to open repository: {e}")))?;

        match repo.head() {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(BugspotsError::Git(format!("failed to resolve HEAD: {e}"))),
        }

        let mut revwalk = repo
            .revwalk()
            .map_err(|e| BugspotsError::Git(format!("failed to create revwalk: {e}")))?;
        revwalk
            .set_sorting(Sort::TIME)
            .map_err(|e| BugspotsError::Git(format!("failed to sort revwalk: {e}")))?;
        revwalk
            .push_head()
            .map_err(|e| BugspotsError::Git(format!("failed to push HEAD: {e}")))?;

        let mut commits = Vec::new();
        for oid_result in revwalk.take(depth) {
            let oid = oid_result.map_err(|e| BugspotsError::Git(format!("revwalk error: {e}")))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| BugspotsError::Git(format!("failed to find commit {oid}: {e}")))?;

            let seconds = commit.author().when().seconds();
            let timestamp = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
                BugspotsError::Git(format!("commit {oid} has an invalid timestamp {seconds}"))
            })?;

            commits.push(Commit {
                hash: oid.to_string(),
                timestamp,
                message: commit.summary().unwrap_or("").to_string(),
            });
        }

        Ok(commits)
    }

    fn diff(&self, old: &str, new: &str) -> Result<Vec<ChangeRecord>> {
        let output = Command::new("git")
            .arg("diff")
            .arg("--name-status")
            .arg("-z")
            .arg("--no-color")
            .arg("--no-ext-diff")
            .arg(format!("-M{}%", self.rename_detection))
            .arg(old)
            .arg(new)
            .current_dir(&self.root)
            .output()
            .map_err(|e| BugspotsError::Git(format!("failed to run git diff: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BugspotsError::Git(format!(
                "git diff {old} {new} failed: {}",
                stderr.trim()
            )));
        }

        parse_name_status(&String::from_utf8_lossy(&output.stdout))
    }
}

/// A fixed history held in memory.
///
/// Diffs are looked up by `(old, new)` hash pair; a pair with no registered
/// diff is an empty change set, and a pair marked as failing returns
/// [`BugspotsError::Git`].
///
/// # Examples
///
/// ```
/// use bugspots_engine::vcs::{ChangeRecord, Commit, InMemoryHistory, VersionControl};
/// use chrono::{TimeZone, Utc};
///
/// let history = InMemoryHistory::new(vec![Commit {
///     hash: "001".into(),
///     timestamp: Utc.timestamp_opt(0, 0).unwrap(),
///     message: "initial commit".into(),
/// }])
/// .with_diff("001", "002", vec![ChangeRecord::Added("foo.js".into())]);
///
/// assert_eq!(history.list_commits(10).unwrap().len(), 1);
/// assert_eq!(history.diff("001", "002").unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    commits: Vec<Commit>,
    diffs: HashMap<(String, String), Vec<ChangeRecord>>,
    failing: HashSet<(String, String)>,
}

impl InMemoryHistory {
    /// A history with `commits` ordered newest first.
    pub fn new(commits: Vec<Commit>) -> Self {
        Self {
            commits,
            ..Self::default()
        }
    }

    /// Register the changes between `old` and `new`.
    pub fn with_diff(mut self, old: &str, new: &str, changes: Vec<ChangeRecord>) -> Self {
        self.diffs.insert((old.to_string(), new.to_string()), changes);
        self
    }

    /// Make diffing `old` against `new` fail.
    pub fn with_failing_diff(mut self, old: &str, new: &str) -> Self {
        self.failing.insert((old.to_string(), new.to_string()));
        self
    }
}

impl VersionControl for InMemoryHistory {
    fn list_commits(&self, depth: usize) -> Result<Vec<Commit>> {
        Ok(self.commits.iter().take(depth).cloned().collect())
    }

    fn diff(&self, old: &str, new: &str) -> Result<Vec<ChangeRecord>> {
        let key = (old.to_string(), new.to_string());
        if self.failing.contains(&key) {
            return Err(BugspotsError::Git(format!("bad revision '{old}..{new}'")));
        }
        Ok(self.diffs.get(&key).cloned().unwrap_or_default())
    }
}

/// Parse `git diff --name-status -z` output.
///
/// Entries are NUL separated: a status token followed by one path, or two
/// paths for renames and copies (`R087\0old\0new\0`).
///
/// # Errors
///
/// Returns [`BugspotsError::Git`] if the output is truncated or carries an
/// unreadable similarity score.
///
/// # Examples
///
/// ```
/// use bugspots_engine::vcs::{parse_name_status, ChangeRecord};
///
/// let records = parse_name_status("M\0src/lib.rs\0R090\0a.rs\0b.rs\0").unwrap();
/// assert_eq!(records[0], ChangeRecord::Modified("src/lib.rs".into()));
/// assert_eq!(
///     records[1],
///     ChangeRecord::Renamed { from: "a.rs".into(), to: "b.rs".into(), similarity: 90 }
/// );
/// ```
pub fn parse_name_status(output: &str) -> Result<Vec<ChangeRecord>> {
    let mut tokens = output.split('\0').filter(|t| !t.is_empty());
    let mut records = Vec::new();

    while let Some(status) = tokens.next() {
        let status = status.trim();
        let mut next_path = |what: &str| {
            tokens.next().map(str::to_string).ok_or_else(|| {
                BugspotsError::Git(format!("diff entry '{status}' is missing its {what} path"))
            })
        };

        let record = match status.chars().next() {
            Some('A') => ChangeRecord::Added(next_path("added")?),
            Some('D') => ChangeRecord::Deleted(next_path("deleted")?),
            Some('R') => {
                let from = next_path("source")?;
                let to = next_path("destination")?;
                ChangeRecord::Renamed {
                    from,
                    to,
                    similarity: parse_score(status)?,
                }
            }
            // Copies keep the source intact; the new file is an addition.
            Some('C') => {
                let _source = next_path("source")?;
                ChangeRecord::Added(next_path("destination")?)
            }
            Some(_) => ChangeRecord::Modified(next_path("modified")?),
            None => continue,
        };
        records.push(record);
    }

    Ok(records)
}

fn parse_score(status: &str) -> Result<u8> {
    let digits = &status[1..];
    if digits.is_empty() {
        return Ok(100);
    }
    digits
        .parse::<u8>()
        .map(|s| s.min(100))
        .map_err(|_| BugspotsError::Git(format!("invalid similarity in status '{status}'")))
}
