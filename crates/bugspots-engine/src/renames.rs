//! Map historical file paths to their names at the tip of history.
//!
//! Rename events are keyed by commit index, where index 0 is the most recent
//! commit transition. The resolver sweeps indices upward, i.e. from the
//! present into the past, so when an older rename `a -> b` is folded, `b` has
//! already been resolved to its present-day name. The sweep cursor never moves
//! backward.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::scanner::{Fix, RenameEvent};

/// Forward-folding rename resolver.
///
/// Runs once, after every diff task has finished; it is never shared
/// between threads.
///
/// # Examples
///
/// ```
/// use bugspots_engine::renames::RenameResolver;
/// use bugspots_engine::scanner::RenameEvent;
///
/// let mut resolver = RenameResolver::new();
/// resolver.record(RenameEvent::new(3, "a.rs", "b.rs"));
/// resolver.record(RenameEvent::new(1, "b.rs", "c.rs"));
/// resolver.advance_to(3);
/// assert_eq!(resolver.current_path("a.rs"), "c.rs");
/// ```
#[derive(Debug, Default)]
pub struct RenameResolver {
    events: BTreeMap<usize, Vec<(String, String)>>,
    frontier: HashMap<String, String>,
    cursor: usize,
}

impl RenameResolver {
    /// An empty resolver with its cursor at index 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver from a complete set of rename events.
    pub fn from_events(events: impl IntoIterator<Item = RenameEvent>) -> Self {
        let mut resolver = Self::new();
        for event in events {
            resolver.record(event);
        }
        resolver
    }

    /// Register a rename observed at `event.commit_index`.
    pub fn record(&mut self, event: RenameEvent) {
        self.events
            .entry(event.commit_index)
            .or_default()
            .push((event.from, event.to));
    }

    /// Fold every recorded rename up to and including `target`.
    ///
    /// Calls with a target at or behind the cursor are no-ops.
    pub fn advance_to(&mut self, target: usize) {
        if self.cursor > target {
            return;
        }
        // Only indices that actually carry events need visiting.
        for (index, renames) in self.events.range(self.cursor..=target) {
            for (from, to) in renames {
                let latest = self.frontier.get(to).cloned().unwrap_or_else(|| to.clone());
                debug!("rename at #{index}: {from} -> {latest}");
                self.frontier.insert(from.clone(), latest);
            }
        }
        self.cursor = target + 1;
    }

    /// Present-day name of `path` given the renames folded so far.
    pub fn current_path<'a>(&'a self, path: &'a str) -> &'a str {
        self.frontier.get(path).map_or(path, String::as_str)
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.cursor
    }

    /// Rewrite every fix's files to their present-day paths.
    ///
    /// Fixes are reordered by ascending commit index first, so the outcome
    /// does not depend on the order they were collected in.
    pub fn resolve(&mut self, fixes: &mut [Fix]) {
        fixes.sort_by_key(|fix| fix.commit_index);
        for fix in fixes.iter_mut() {
            self.advance_to(fix.commit_index);
            for file in &mut fix.files {
                if let Some(latest) = self.frontier.get(file.as_str()) {
                    *file = latest.clone();
                }
            }
        }
    }
}
