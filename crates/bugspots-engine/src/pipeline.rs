//! End-to-end hotspot detection: list commits, diff pairs, resolve renames,
//! score.

use std::sync::Arc;

use bugspots_core::{BugspotsError, Result, ScanConfig};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use crate::classify::FixClassifier;
use crate::hotspots::{rank_hotspots, Hotspot};
use crate::progress::ProgressObserver;
use crate::renames::RenameResolver;
use crate::scanner::{scan_history, Fix, ScanOptions};
use crate::vcs::VersionControl;

/// Result of a completed scan.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotReport {
    /// Number of commits read from history.
    pub commits: usize,
    /// Number of adjacent commit pairs diffed.
    pub pairs: usize,
    /// Fix commits with present-day paths, ordered by commit index.
    pub fixes: Vec<Fix>,
    /// Ranking, highest score first.
    pub hotspots: Vec<Hotspot>,
}

/// Drives a full scan over a [`VersionControl`] source.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use bugspots_engine::pipeline::HotspotPipeline;
/// use bugspots_engine::progress::NoProgress;
/// use bugspots_engine::scanner::ScanOptions;
/// use bugspots_engine::vcs::InMemoryHistory;
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let pipeline = HotspotPipeline::new(
///     Arc::new(InMemoryHistory::default()),
///     100,
///     ScanOptions::default(),
/// );
/// let report = rt.block_on(pipeline.run(&NoProgress)).unwrap();
/// assert!(report.hotspots.is_empty());
/// ```
pub struct HotspotPipeline<V: ?Sized> {
    source: Arc<V>,
    depth: usize,
    options: ScanOptions,
}

impl<V> HotspotPipeline<V>
where
    V: VersionControl + ?Sized,
{
    /// Scan at most `depth` commits of `source`.
    pub fn new(source: Arc<V>, depth: usize, options: ScanOptions) -> Self {
        Self {
            source,
            depth,
            options,
        }
    }

    /// Build a pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BugspotsError::Config`] for invalid option values or a
    /// malformed fix pattern; nothing has been scanned at that point.
    pub fn from_config(source: Arc<V>, config: &ScanConfig) -> Result<Self> {
        config.validate()?;
        let options = ScanOptions {
            similarity: config.similarity,
            concurrency: config.concurrency,
            classifier: FixClassifier::new(&config.pattern)?,
        };
        Ok(Self::new(source, config.depth, options))
    }

    /// Scan options in effect.
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Run the scan, scoring recency against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`BugspotsError::Git`] if commits cannot be listed or any diff
    /// fails; no partial ranking is produced.
    pub async fn run(&self, progress: &dyn ProgressObserver) -> Result<HotspotReport> {
        self.run_at(Utc::now(), progress).await
    }

    /// Run the scan, scoring recency against `now`.
    ///
    /// # Errors
    ///
    /// See [`HotspotPipeline::run`].
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        progress: &dyn ProgressObserver,
    ) -> Result<HotspotReport> {
        let source = Arc::clone(&self.source);
        let depth = self.depth;
        let commits = tokio::task::spawn_blocking(move || source.list_commits(depth))
            .await
            .map_err(|e| BugspotsError::Task(format!("listing commits did not finish: {e}")))??;
        info!(
            "read {} commits; fix pattern {}",
            commits.len(),
            self.options.classifier.as_str()
        );

        let outcome =
            scan_history(Arc::clone(&self.source), &commits, &self.options, progress).await?;

        let mut report = HotspotReport {
            commits: commits.len(),
            pairs: outcome.pairs,
            fixes: outcome.fixes,
            hotspots: Vec::new(),
        };
        if report.fixes.is_empty() {
            return Ok(report);
        }

        RenameResolver::from_events(outcome.renames).resolve(&mut report.fixes);
        report.hotspots = rank_hotspots(&report.fixes, now);
        info!("ranked {} files", report.hotspots.len());

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::vcs::{ChangeRecord, Commit, InMemoryHistory};

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn commit(hash: &str, millis: i64, message: &str) -> Commit {
        Commit {
            hash: hash.into(),
            timestamp: at(millis),
            message: message.into(),
        }
    }

    fn pipeline(history: InMemoryHistory) -> HotspotPipeline<InMemoryHistory> {
        HotspotPipeline::new(Arc::new(history), 1000, ScanOptions::default())
    }

    #[tokio::test]
    async fn empty_history_is_empty_ranking() {
        let report = pipeline(InMemoryHistory::default())
            .run_at(at(0), &NoProgress)
            .await
            .unwrap();
        assert_eq!(report.commits, 0);
        assert!(report.hotspots.is_empty());
    }

    #[tokio::test]
    async fn single_commit_is_empty_ranking() {
        let history = InMemoryHistory::new(vec![commit("001", 0, "initial commit")]);
        let report = pipeline(history).run_at(at(0), &NoProgress).await.unwrap();
        assert_eq!(report.commits, 1);
        assert_eq!(report.pairs, 0);
        assert!(report.hotspots.is_empty());
    }

    #[tokio::test]
    async fn no_fix_commits_is_empty_ranking() {
        let history = InMemoryHistory::new(vec![
            commit("002", 1, "add feature"),
            commit("001", 0, "initial commit"),
        ])
        .with_diff("001", "002", vec![ChangeRecord::Added("foo.js".into())]);
        let report = pipeline(history).run_at(at(2), &NoProgress).await.unwrap();
        assert_eq!(report.pairs, 1);
        assert!(report.fixes.is_empty());
        assert!(report.hotspots.is_empty());
    }

    #[tokio::test]
    async fn one_fix_reference_fixture() {
        let history = InMemoryHistory::new(vec![
            commit("002", 1, "fix: foo"),
            commit("001", 0, "initial commit"),
        ])
        .with_diff("001", "002", vec![ChangeRecord::Added("foo.js".into())]);

        let report = pipeline(history).run_at(at(2), &NoProgress).await.unwrap();

        assert_eq!(report.hotspots.len(), 1);
        assert_eq!(report.hotspots[0].path, "foo.js");
        assert!((report.hotspots[0].score - 0.000006144174602214718).abs() < 1e-18);
    }

    #[tokio::test]
    async fn sorted_reference_fixture() {
        let history = InMemoryHistory::new(vec![
            commit("003", 2, "fix: bar"),
            commit("002", 1, "fix: foo"),
            commit("001", 0, "initial commit"),
        ])
        .with_diff("001", "002", vec![ChangeRecord::Added("foo.js".into())])
        .with_diff("002", "003", vec![ChangeRecord::Added("bar.js".into())]);

        let report = pipeline(history).run_at(at(3), &NoProgress).await.unwrap();

        let ranked: Vec<&str> = report.hotspots.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(ranked, vec!["bar.js", "foo.js"]);
        assert!((report.hotspots[0].score - 0.0024726231566347743).abs() < 1e-15);
        assert!((report.hotspots[1].score - 0.000006144174602214718).abs() < 1e-18);
        assert!(report.hotspots[0].score > report.hotspots[1].score * 100.0);
    }

    #[tokio::test]
    async fn fixes_are_credited_to_present_day_names() {
        // 004 fix touches lib.rs; 003 renames core.rs -> lib.rs;
        // 002 fix touches core.rs; 001 is the root.
        let history = InMemoryHistory::new(vec![
            commit("004", 4_000, "fix: lib panic"),
            commit("003", 3_000, "rename core to lib"),
            commit("002", 2_000, "Fixed core bug"),
            commit("001", 1_000, "initial commit"),
        ])
        .with_diff("003", "004", vec![ChangeRecord::Modified("lib.rs".into())])
        .with_diff(
            "002",
            "003",
            vec![ChangeRecord::Renamed {
                from: "core.rs".into(),
                to: "lib.rs".into(),
                similarity: 98,
            }],
        )
        .with_diff("001", "002", vec![ChangeRecord::Modified("core.rs".into())]);

        let report = pipeline(history).run_at(at(5_000), &NoProgress).await.unwrap();

        assert_eq!(report.hotspots.len(), 1);
        assert_eq!(report.hotspots[0].path, "lib.rs");
        assert_eq!(report.hotspots[0].fixes, 2);
        let indices: Vec<usize> = report.fixes.iter().map(|f| f.commit_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn weak_rename_keeps_old_identity() {
        let history = InMemoryHistory::new(vec![
            commit("003", 3_000, "fix: lib panic"),
            commit("002", 2_000, "rewrite core as lib"),
            commit("001", 1_000, "fix core"),
            commit("000", 0, "initial commit"),
        ])
        .with_diff("002", "003", vec![ChangeRecord::Modified("lib.rs".into())])
        .with_diff(
            "001",
            "002",
            vec![ChangeRecord::Renamed {
                from: "core.rs".into(),
                to: "lib.rs".into(),
                similarity: 40,
            }],
        )
        .with_diff("000", "001", vec![ChangeRecord::Modified("core.rs".into())]);

        let report = pipeline(history).run_at(at(4_000), &NoProgress).await.unwrap();

        let mut paths: Vec<&str> = report.hotspots.iter().map(|h| h.path.as_str()).collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["core.rs", "lib.rs"]);
    }

    #[tokio::test]
    async fn add_beside_rename_counts_as_one_fix() {
        let history = InMemoryHistory::new(vec![
            commit("002", 2_000, "fix: split module"),
            commit("001", 1_000, "initial commit"),
        ])
        .with_diff(
            "001",
            "002",
            vec![
                ChangeRecord::Added("a.rs".into()),
                ChangeRecord::Renamed {
                    from: "a.rs".into(),
                    to: "b.rs".into(),
                    similarity: 95,
                },
            ],
        );

        let report = pipeline(history).run_at(at(3_000), &NoProgress).await.unwrap();

        assert_eq!(report.hotspots.len(), 1);
        assert_eq!(report.hotspots[0].path, "b.rs");
        assert_eq!(report.hotspots[0].fixes, 1);
    }

    #[tokio::test]
    async fn failed_diff_produces_no_report() {
        let history = InMemoryHistory::new(vec![
            commit("003", 2, "fix: bar"),
            commit("002", 1, "fix: foo"),
            commit("001", 0, "initial commit"),
        ])
        .with_failing_diff("001", "002");

        let result = pipeline(history).run_at(at(3), &NoProgress).await;
        assert!(matches!(result, Err(BugspotsError::Git(_))));
    }

    #[test]
    fn malformed_pattern_is_rejected_before_scanning() {
        let config = ScanConfig {
            pattern: "fix(".into(),
            ..ScanConfig::default()
        };
        let result = HotspotPipeline::from_config(Arc::new(InMemoryHistory::default()), &config);
        assert!(matches!(result, Err(BugspotsError::Config(_))));
    }

    #[test]
    fn from_config_carries_scan_settings() {
        let config = ScanConfig {
            concurrency: 2,
            similarity: 65,
            pattern: r"\bbug\b".into(),
            ..ScanConfig::default()
        };
        let pipeline =
            HotspotPipeline::from_config(Arc::new(InMemoryHistory::default()), &config).unwrap();
        assert_eq!(pipeline.options().concurrency, 2);
        assert_eq!(pipeline.options().similarity, 65);
        assert!(pipeline.options().classifier.is_fix("BUG in parser"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = ScanConfig {
            concurrency: 0,
            ..ScanConfig::default()
        };
        let result = HotspotPipeline::from_config(Arc::new(InMemoryHistory::default()), &config);
        assert!(result.is_err());
    }
}
