//! Render a hotspot ranking as text, JSON, or Markdown.

use std::fmt::Write as _;

use bugspots_core::{OutputFormat, Result};
use serde::Serialize;

use crate::hotspots::Hotspot;
use crate::pipeline::HotspotReport;

const SCORE_WIDTH: usize = 20;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    commits_scanned: usize,
    pairs_diffed: usize,
    fix_commits: usize,
    hotspots: &'a [Hotspot],
}

/// Format a score for the text report.
///
/// The score is rounded to 20 decimal places and right-padded with zeros to
/// 20 characters; longer renderings are left as they are.
///
/// # Examples
///
/// ```
/// use bugspots_engine::report::format_score;
///
/// assert_eq!(format_score(0.5), "0.500000000000000000");
/// assert_eq!(format_score(0.00000614417460221472), "0.00000614417460221472");
/// assert_eq!(format_score(2.0), "2.000000000000000000");
/// ```
pub fn format_score(score: f64) -> String {
    let rounded = (score * 1e20).round() / 1e20;
    let mut text = rounded.to_string();
    if !text.contains('.') {
        text.push('.');
    }
    while text.len() < SCORE_WIDTH {
        text.push('0');
    }
    text
}

/// One `<score>\t<path>` line per hotspot, most important first.
///
/// # Examples
///
/// ```
/// use bugspots_engine::hotspots::Hotspot;
/// use bugspots_engine::report::render_text;
///
/// let spots = [Hotspot { path: "a.rs".into(), score: 0.5, fixes: 1 }];
/// assert_eq!(render_text(&spots), "0.500000000000000000\ta.rs");
/// ```
pub fn render_text(hotspots: &[Hotspot]) -> String {
    hotspots
        .iter()
        .map(|h| format!("{}\t{}", format_score(h.score), h.path))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown table of the ranking.
pub fn render_markdown(report: &HotspotReport, hotspots: &[Hotspot]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Bug Hotspots\n");
    let _ = writeln!(
        out,
        "**Commits scanned:** {} | **Fix commits:** {}\n",
        report.commits,
        report.fixes.len()
    );

    if hotspots.is_empty() {
        let _ = writeln!(out, "No hotspots detected.");
        return out;
    }

    let _ = writeln!(out, "| Rank | File | Score | Fixes |");
    let _ = writeln!(out, "|------|------|-------|-------|");
    for (i, h) in hotspots.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | `{}` | {:.6} | {} |",
            i + 1,
            h.path,
            h.score,
            h.fixes
        );
    }
    out
}

/// Render `report` in `format`, keeping at most `limit` entries.
///
/// # Errors
///
/// Returns a serialization error if JSON encoding fails.
pub fn render(
    report: &HotspotReport,
    format: OutputFormat,
    limit: Option<usize>,
) -> Result<String> {
    let shown = match limit {
        Some(n) => &report.hotspots[..n.min(report.hotspots.len())],
        None => &report.hotspots[..],
    };

    match format {
        OutputFormat::Text => Ok(render_text(shown)),
        OutputFormat::Markdown => Ok(render_markdown(report, shown)),
        OutputFormat::Json => {
            let json = JsonReport {
                commits_scanned: report.commits,
                pairs_diffed: report.pairs,
                fix_commits: report.fixes.len(),
                hotspots: shown,
            };
            Ok(serde_json::to_string_pretty(&json)?)
        }
    }
}
