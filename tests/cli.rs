use std::path::Path;
use std::process::Command;

use git2::{Repository, Signature, Time};

fn bugspots(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_bugspots"))
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn commit(repo: &Repository, seconds: i64, message: &str, path: &str, content: &str) {
    let root = repo.workdir().unwrap();
    std::fs::write(root.join(path), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new("Dev", "dev@example.com", &Time::new(seconds, 0)).unwrap();
    let parent = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .map(|oid| repo.find_commit(oid).unwrap());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = bugspots(dir.path(), &["init"]);
    assert!(
        output.status.success(),
        "bugspots init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".bugspots.toml");
    assert!(config_path.exists(), ".bugspots.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[scan]"));
    assert!(content.contains("[output]"));

    let config: bugspots_core::BugspotsConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.scan.concurrency, 10);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".bugspots.toml"), "# existing").unwrap();

    let output = bugspots(dir.path(), &["init"]);
    assert!(!output.status.success());
}

#[test]
fn scan_outside_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = bugspots(dir.path(), &["scan", "--quiet"]);
    assert!(!output.status.success());
    assert!(!dir.path().join("hotspot.txt").exists());
}

#[test]
fn invalid_similarity_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    Repository::init(dir.path()).unwrap();
    let output = bugspots(dir.path(), &["scan", "--similarity", "150"]);
    assert!(!output.status.success());
}

#[test]
fn scan_writes_ranking_file() {
    if !git_available() {
        eprintln!("git executable not found; skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit(&repo, 1_000, "initial commit", "a.txt", "one\n");
    commit(&repo, 2_000, "fix: a", "a.txt", "two\n");
    commit(&repo, 3_000, "add b", "b.txt", "b\n");
    commit(&repo, 4_000, "Closes #12", "b.txt", "bb\n");

    let output = bugspots(dir.path(), &["scan", "--quiet"]);
    assert!(
        output.status.success(),
        "bugspots scan failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let text = std::fs::read_to_string(dir.path().join("hotspot.txt")).unwrap();
    let paths: Vec<&str> = text
        .lines()
        .map(|line| line.split('\t').nth(1).unwrap())
        .collect();
    assert_eq!(paths, vec!["b.txt", "a.txt"]);
    assert!(text.lines().all(|line| line.split('\t').next().unwrap().len() >= 20));
}

#[test]
fn scan_to_stdout_as_json_respects_limit() {
    if !git_available() {
        eprintln!("git executable not found; skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit(&repo, 1_000, "initial commit", "a.txt", "one\n");
    commit(&repo, 2_000, "fixed a", "a.txt", "two\n");
    commit(&repo, 3_000, "fixes b", "b.txt", "b\n");

    let output = bugspots(
        dir.path(),
        &["scan", "--quiet", "-f", "-", "--format", "json", "--limit", "1"],
    );
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["commitsScanned"], 3);
    assert_eq!(value["fixCommits"], 2);
    assert_eq!(value["hotspots"].as_array().unwrap().len(), 1);
    assert_eq!(value["hotspots"][0]["path"], "b.txt");
    assert!(!dir.path().join("hotspot.txt").exists());
}
