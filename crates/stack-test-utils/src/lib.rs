//! Temp-repo fixtures for exercising the rewrite engine in tests.
//!
//! Deliberately does not depend on `git-executor`: this crate sits below
//! `object-store` in the dependency graph (object-store's own tests use it),
//! so pulling in the executor would create a cycle. Every git invocation here
//! goes through a bare `std::process::Command` instead.

use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A throwaway git repository rooted in a `TempDir`. Dropped (and deleted)
/// when it goes out of scope.
pub struct TestRepo {
  dir: TempDir,
}

impl TestRepo {
  /// Initializes a repo with a deterministic identity and `zdiff3` conflict
  /// markers, matching what the engine expects to see in `merge-tree` output.
  pub fn new() -> Self {
    let dir = TempDir::new().expect("failed to create temp dir");
    let repo = Self { dir };
    repo.run(&["init", "-q", "-b", "master"]).expect("git init failed");
    repo.run(&["config", "user.name", "Test User"]).expect("git config failed");
    repo.run(&["config", "user.email", "test@example.com"]).expect("git config failed");
    repo.run(&["config", "merge.conflictstyle", "zdiff3"]).expect("git config failed");
    repo.run(&["config", "commit.gpgsign", "false"]).expect("git config failed");
    repo
  }

  pub fn path(&self) -> &Path {
    self.dir.path()
  }

  fn run(&self, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
      .args(args)
      .current_dir(self.path())
      .output()
      .with_context(|| format!("failed to spawn git {}", args.join(" ")))?;
    if !output.status.success() {
      return Err(anyhow!("git {} failed: {}", args.join(" "), String::from_utf8_lossy(&output.stderr)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Writes `content` to `filename` and commits it. `message` may be empty,
  /// in which case `--allow-empty-message` is used.
  pub fn create_commit(&self, message: &str, filename: &str, content: &str) -> String {
    self.create_commit_with_files(message, &[(filename, content)])
  }

  pub fn create_commit_with_files(&self, message: &str, files: &[(&str, &str)]) -> String {
    for (name, content) in files {
      let path = self.path().join(name);
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create parent dir");
      }
      std::fs::write(&path, content).expect("failed to write fixture file");
      self.run(&["add", name]).expect("git add failed");
    }
    let mut args = vec!["commit", "-q"];
    if message.is_empty() {
      args.push("--allow-empty-message");
      args.push("-m");
      args.push("");
    } else {
      args.push("-m");
      args.push(message);
    }
    self.run(&args).expect("git commit failed");
    self.head()
  }

  /// Stages a deletion and commits it.
  pub fn delete_file(&self, message: &str, filename: &str) -> String {
    self.run(&["rm", "-q", filename]).expect("git rm failed");
    self.run(&["commit", "-q", "-m", message]).expect("git commit failed");
    self.head()
  }

  pub fn create_branch(&self, name: &str) -> Result<()> {
    self.run(&["branch", name]).map(|_| ())
  }

  pub fn create_branch_at(&self, name: &str, hash: &str) -> Result<()> {
    self.run(&["branch", name, hash]).map(|_| ())
  }

  pub fn checkout(&self, reference: &str) -> Result<()> {
    self.run(&["checkout", "-q", reference]).map(|_| ())
  }

  pub fn reset_hard(&self, hash: &str) -> Result<()> {
    self.run(&["reset", "-q", "--hard", hash]).map(|_| ())
  }

  pub fn head(&self) -> String {
    self.run(&["rev-parse", "HEAD"]).expect("rev-parse HEAD failed")
  }

  pub fn rev_parse(&self, reference: &str) -> Result<String> {
    self.run(&["rev-parse", reference])
  }

  pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
    self.run(&["config", key, value]).map(|_| ())
  }

  pub fn branch_exists(&self, name: &str) -> bool {
    self.run(&["rev-parse", "--verify", "--quiet", &format!("refs/heads/{name}")]).is_ok()
  }

  pub fn get_files_in_commit(&self, hash: &str) -> Vec<String> {
    self
      .run(&["ls-tree", "-r", "--name-only", hash])
      .map(|out| out.lines().map(str::to_string).collect())
      .unwrap_or_default()
  }

  pub fn read_file(&self, relative: &str) -> String {
    std::fs::read_to_string(self.path().join(relative)).unwrap_or_default()
  }

  pub fn working_dir(&self) -> PathBuf {
    self.path().to_path_buf()
  }
}

impl Default for TestRepo {
  fn default() -> Self {
    Self::new()
  }
}

/// A deliberately conflicting pair of commits built on top of a shared base,
/// for exercising `merge-tree`/plumbing-rebase conflict handling.
pub struct ConflictScenario {
  pub target_commit: String,
  pub cherry_commit: String,
}

/// Builds two diverging commits on the same file so a three-way merge
/// between them is guaranteed to conflict (or, for the deletion scenario, to
/// conflict on a modify/delete).
pub struct ConflictTestBuilder<'a> {
  repo: &'a TestRepo,
  initial: Vec<(&'a str, &'a str)>,
  target: Vec<(&'a str, &'a str)>,
  cherry: Vec<(&'a str, &'a str)>,
}

impl<'a> ConflictTestBuilder<'a> {
  pub fn new(repo: &'a TestRepo) -> Self {
    Self { repo, initial: Vec::new(), target: Vec::new(), cherry: Vec::new() }
  }

  pub fn with_initial_state(mut self, files: &[(&'a str, &'a str)]) -> Self {
    self.initial = files.to_vec();
    self
  }

  pub fn with_target_changes(mut self, files: &[(&'a str, &'a str)]) -> Self {
    self.target = files.to_vec();
    self
  }

  pub fn with_cherry_changes(mut self, files: &[(&'a str, &'a str)]) -> Self {
    self.cherry = files.to_vec();
    self
  }

  pub fn build(self) -> ConflictScenario {
    let base = self.repo.create_commit_with_files("base", &self.initial);

    let target_commit = if self.target.is_empty() {
      // deletion scenario: target side deletes every file the base introduced
      let mut hash = base.clone();
      for (name, _) in &self.initial {
        hash = self.repo.delete_file(&format!("delete {name}"), name);
      }
      hash
    } else {
      self.repo.create_commit_with_files("target changes", &self.target)
    };

    self.repo.reset_hard(&base).expect("reset to base failed");
    let cherry_commit = self.repo.create_commit_with_files("cherry changes", &self.cherry);

    ConflictScenario { target_commit, cherry_commit }
  }
}

/// Shorthand for the common modify/delete conflict: base introduces a file,
/// the target side deletes it, the cherry side edits it.
pub fn setup_deletion_conflict(repo: &TestRepo) -> ConflictScenario {
  ConflictTestBuilder::new(repo)
    .with_initial_state(&[("a.txt", "base content")])
    .with_target_changes(&[])
    .with_cherry_changes(&[("a.txt", "edited content")])
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn create_commit_roundtrips_through_head() {
    let repo = TestRepo::new();
    let hash = repo.create_commit("first", "a.txt", "1");
    assert_eq!(hash, repo.head());
  }

  #[test]
  fn reset_hard_moves_head() {
    let repo = TestRepo::new();
    let first = repo.create_commit("first", "a.txt", "1");
    repo.create_commit("second", "a.txt", "2");
    repo.reset_hard(&first).unwrap();
    assert_eq!(repo.head(), first);
  }

  #[test]
  fn deletion_conflict_scenario_diverges_from_base() {
    let repo = TestRepo::new();
    let scenario = setup_deletion_conflict(&repo);
    assert_ne!(scenario.target_commit, scenario.cherry_commit);
    assert!(repo.get_files_in_commit(&scenario.target_commit).is_empty());
    assert_eq!(repo.get_files_in_commit(&scenario.cherry_commit), vec!["a.txt".to_string()]);
  }
}
