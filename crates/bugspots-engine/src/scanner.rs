//! Diff every adjacent commit pair with bounded concurrency.
//!
//! Pair `i` is `(commits[i], commits[i + 1])`, so index 0 is the most recent
//! transition and indices grow going back in history. Each pair is diffed on
//! the blocking pool; a semaphore caps how many diffs run at once. Results are
//! funnelled back to the coordinating task, which is the only writer of the
//! fix and rename collections.

use std::sync::Arc;

use bugspots_core::{BugspotsError, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::classify::FixClassifier;
use crate::progress::ProgressObserver;
use crate::vcs::{ChangeRecord, Commit, VersionControl};

/// A fix-classified commit and the files it touched.
///
/// `files` holds paths as they were named on the older side of the diff until
/// the rename resolver rewrites them to present-day names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    /// Index of the commit pair this fix closes.
    pub commit_index: usize,
    /// Commit message summary.
    pub message: String,
    /// When the fix was committed.
    pub timestamp: DateTime<Utc>,
    /// Paths touched by the fix.
    pub files: Vec<String>,
}

/// A rename that met the similarity threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEvent {
    /// Index of the commit pair the rename happened in.
    pub commit_index: usize,
    /// Path before the rename.
    pub from: String,
    /// Path after the rename.
    pub to: String,
}

impl RenameEvent {
    pub fn new(commit_index: usize, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            commit_index,
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Knobs for a history scan.
///
/// # Examples
///
/// ```
/// use bugspots_engine::scanner::ScanOptions;
///
/// let opts = ScanOptions::default();
/// assert_eq!(opts.concurrency, 10);
/// assert_eq!(opts.similarity, 80);
/// ```
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Minimum similarity percentage for a rename to be followed.
    pub similarity: u8,
    /// Maximum number of diffs in flight.
    pub concurrency: usize,
    /// Decides which commits are fixes.
    pub classifier: FixClassifier,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            similarity: 80,
            concurrency: 10,
            classifier: FixClassifier::default(),
        }
    }
}

/// Raw scan results, before rename resolution.
///
/// Neither collection is in any particular order.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Number of commit pairs diffed.
    pub pairs: usize,
    /// One entry per fix-classified commit.
    pub fixes: Vec<Fix>,
    /// Every rename that met the similarity threshold.
    pub renames: Vec<RenameEvent>,
}

/// Adjacent `(newer, older)` pairs of a newest-first list.
///
/// # Examples
///
/// ```
/// use bugspots_engine::scanner::pairwise;
///
/// assert_eq!(pairwise(&[1, 2, 3]), vec![(&1, &2), (&2, &3)]);
/// assert!(pairwise(&[1]).is_empty());
/// ```
pub fn pairwise<T>(items: &[T]) -> Vec<(&T, &T)> {
    items.windows(2).map(|w| (&w[0], &w[1])).collect()
}

/// Diff every adjacent pair of `commits` and collect fixes and renames.
///
/// Fewer than two commits yields an empty outcome.
///
/// # Errors
///
/// The first failed diff aborts the scan: pending diffs are cancelled and the
/// error is returned without partial results. A panicking diff surfaces as
/// [`BugspotsError::Task`].
pub async fn scan_history<V>(
    source: Arc<V>,
    commits: &[Commit],
    options: &ScanOptions,
    progress: &dyn ProgressObserver,
) -> Result<ScanOutcome>
where
    V: VersionControl + ?Sized,
{
    let pairs = pairwise(commits);
    let total = pairs.len();
    progress.on_start(total);
    if total == 0 {
        return Ok(ScanOutcome::default());
    }

    info!(
        "diffing {total} commit pairs with up to {} in flight",
        options.concurrency
    );

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (commit_index, (newer, older)) in pairs.into_iter().enumerate() {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let newer = newer.clone();
        let old_hash = older.hash.clone();
        let is_fix = options.classifier.is_fix(&newer.message);
        let similarity = options.similarity;

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| BugspotsError::Task(format!("diff limiter closed: {e}")))?;

            let new_hash = newer.hash.clone();
            let records = tokio::task::spawn_blocking(move || source.diff(&old_hash, &new_hash))
                .await
                .map_err(|e| {
                    BugspotsError::Task(format!("diff of pair #{commit_index} did not finish: {e}"))
                })??;

            debug!(
                "pair #{commit_index} ({}): {} changes",
                newer.hash,
                records.len()
            );
            Ok::<_, BugspotsError>(scan_pair(commit_index, &newer, is_fix, records, similarity))
        });
    }

    let mut outcome = ScanOutcome {
        pairs: total,
        ..ScanOutcome::default()
    };

    while let Some(joined) = tasks.join_next().await {
        let pair = match joined {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                tasks.abort_all();
                return Err(e);
            }
            Err(e) => {
                tasks.abort_all();
                return Err(BugspotsError::Task(e.to_string()));
            }
        };

        progress.on_tick();
        outcome.renames.extend(pair.renames);
        outcome.fixes.extend(pair.fix);
    }

    info!(
        "found {} fix commits and {} renames",
        outcome.fixes.len(),
        outcome.renames.len()
    );
    Ok(outcome)
}

struct PairScan {
    fix: Option<Fix>,
    renames: Vec<RenameEvent>,
}

fn scan_pair(
    commit_index: usize,
    newer: &Commit,
    is_fix: bool,
    records: Vec<ChangeRecord>,
    similarity: u8,
) -> PairScan {
    let mut renames = Vec::new();
    let mut files = Vec::with_capacity(records.len());

    for record in records {
        if let ChangeRecord::Renamed {
            from,
            to,
            similarity: score,
        } = &record
        {
            if *score >= similarity {
                renames.push(RenameEvent::new(commit_index, from.as_str(), to.as_str()));
            }
        }
        files.push(record.source_path().to_string());
    }

    let fix = is_fix.then(|| Fix {
        commit_index,
        message: newer.message.clone(),
        timestamp: newer.timestamp,
        files,
    });

    PairScan { fix, renames }
}
