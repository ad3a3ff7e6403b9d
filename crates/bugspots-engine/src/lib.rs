//! Bug hotspot detection over git history.
//!
//! Diffs every adjacent commit pair with bounded concurrency, classifies fix
//! commits by message, follows renames forward to present-day paths, and
//! scores files by how recently they were fixed (the bugspots algorithm).

pub mod classify;
pub mod hotspots;
pub mod pipeline;
pub mod progress;
pub mod renames;
pub mod report;
pub mod scanner;
pub mod vcs;
