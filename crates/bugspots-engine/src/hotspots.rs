//! Time-decayed hotspot scoring.
//!
//! Every (fix, file) pair contributes a logistic weight of the fix's recency,
//! normalised between the oldest fix (t = 0) and `now` (t = 1):
//!
//! ```text
//! t      = 1 - (now - fixed_at) / (now - oldest)
//! weight = 1 / (1 + e^(-12t + 12))
//! ```
//!
//! Recent fixes weigh close to 1 and old ones close to 0.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scanner::Fix;

/// A file and its accumulated fix weight.
///
/// # Examples
///
/// ```
/// use bugspots_engine::hotspots::Hotspot;
///
/// let h = Hotspot {
///     path: "src/parser.rs".into(),
///     score: 0.73,
///     fixes: 4,
/// };
/// assert!(h.score > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// Present-day path relative to the repository root.
    pub path: String,
    /// Sum of decayed fix weights, always non-negative.
    pub score: f64,
    /// Number of fix commits touching the file.
    pub fixes: u32,
}

/// Weight of a fix at normalised recency `t`.
///
/// # Examples
///
/// ```
/// use bugspots_engine::hotspots::decay_weight;
///
/// assert!((decay_weight(1.0) - 0.5).abs() < 1e-12);
/// assert!(decay_weight(0.0) < 1e-5);
/// ```
pub fn decay_weight(t: f64) -> f64 {
    1.0 / (1.0 + (-12.0 * t + 12.0).exp())
}

/// Aggregate fixes into a ranking, highest score first.
///
/// Fixes are expected to carry present-day paths already. The oldest fix is
/// the one with the smallest timestamp. When every fix happened at `now` the
/// span is empty and each weighs as much as a fix at `now` (t = 1).
///
/// Every (fix, file) entry adds its weight, but a fix listing the same path
/// twice still counts once toward [`Hotspot::fixes`].
///
/// Ties keep the order in which paths were first seen.
pub fn rank_hotspots(fixes: &[Fix], now: DateTime<Utc>) -> Vec<Hotspot> {
    let Some(oldest) = fixes.iter().map(|f| f.timestamp).min() else {
        return Vec::new();
    };
    let span = millis_between(oldest, now);

    let mut hotspots: Vec<Hotspot> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    // Position in `fixes` of the last fix counted for each slot.
    let mut last_counted: Vec<usize> = Vec::new();

    for (position, fix) in fixes.iter().enumerate() {
        let t = if span > 0.0 {
            1.0 - millis_between(fix.timestamp, now) / span
        } else {
            1.0
        };
        let weight = decay_weight(t);

        for file in &fix.files {
            let slot = *slots.entry(file.as_str()).or_insert_with(|| {
                hotspots.push(Hotspot {
                    path: file.clone(),
                    score: 0.0,
                    fixes: 0,
                });
                last_counted.push(usize::MAX);
                hotspots.len() - 1
            });
            hotspots[slot].score += weight;
            if last_counted[slot] != position {
                last_counted[slot] = position;
                hotspots[slot].fixes += 1;
            }
        }
    }

    // Stable, so equal scores stay in first-seen order.
    hotspots.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hotspots
}

fn millis_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64
}
