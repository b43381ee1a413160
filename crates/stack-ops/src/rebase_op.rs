use crate::engine::StackOps;
use crate::error::{Result, StackOpsError};
use crate::reports::RebaseOntoBaseReport;
use rewrite_engine::{RewriteEngineError, finalize, rebase_onto};
use std::path::Path;
use tracing::instrument;

impl StackOps {
  /// Replays the whole stack onto a fresh base (defaults to the integration
  /// branch). Refuses to start over a dirty working tree or an already
  /// in-progress rebase; on conflict, hands the repository to a real `git
  /// rebase` so the user can resolve it the way they already know how,
  /// rather than inventing a bespoke conflict-resolution UI (§4.I, §9).
  #[instrument(skip(self))]
  pub fn rebase_onto_base(&self, base_ref: Option<&str>) -> Result<RebaseOntoBaseReport> {
    let branch = self.current_branch()?;
    self.version_check()?;

    if let Some(state) = self.detect_in_progress_rebase() {
      return Err(state);
    }
    if let Some(files) = self.dirty_worktree_files()? {
      return Err(StackOpsError::DirtyWorkingTree { files });
    }

    let commits = self.load_commits()?;
    if commits.is_empty() {
      let base = self.store.resolve_short(&self.config.integration_branch)?;
      return Ok(RebaseOntoBaseReport { rebased: false, base });
    }

    let base_spec = base_ref.unwrap_or(&self.config.integration_branch);
    let base = self.store.resolve_short(base_spec)?;

    let order: Vec<String> = commits.iter().map(|c| c.hash.clone()).collect();
    let original_tip = order.last().expect("non-empty").clone();

    match rebase_onto(&self.store, &base, &order) {
      Ok(rewrite) => {
        finalize(&self.store, &branch, &original_tip, &rewrite.new_tip)?;
        Ok(RebaseOntoBaseReport { rebased: true, base })
      }
      Err(RewriteEngineError::Conflict { at, detail }) => {
        let subject = self.store.get_message(&at).unwrap_or_default().lines().next().unwrap_or_default().to_string();
        let files = crate::error::conflict_files(&detail);
        // Leave the repository in the state a real interactive rebase would:
        // its own conflict markers and `.git/rebase-merge` bookkeeping, for
        // the user to resolve with the tools they already know.
        let _ = self.git.execute_command(&["rebase", &base], &self.config.repo_path);
        Err(StackOpsError::RebaseConflict { at, files, subject })
      }
      Err(other) => Err(other.into()),
    }
  }

  fn detect_in_progress_rebase(&self) -> Option<StackOpsError> {
    let git_dir = Path::new(&self.config.repo_path).join(".git");
    let in_progress = git_dir.join("rebase-merge").is_dir() || git_dir.join("rebase-apply").is_dir();
    if !in_progress {
      return None;
    }
    let current_commit = self.git.execute_command(&["rev-parse", "HEAD"], &self.config.repo_path).unwrap_or_default().trim().to_string();
    let files = self
      .git
      .execute_command(&["diff", "--name-only", "--diff-filter=U"], &self.config.repo_path)
      .map(|out| out.lines().map(str::to_string).collect())
      .unwrap_or_default();
    Some(StackOpsError::InProgress { files, current_commit })
  }

  fn dirty_worktree_files(&self) -> Result<Option<Vec<String>>> {
    let status = self.git.execute_command(&["status", "--porcelain", "--untracked-files=no"], &self.config.repo_path)?;
    if status.trim().is_empty() {
      return Ok(None);
    }
    let files: Vec<String> = status.lines().map(|line| line.get(3..).unwrap_or(line).to_string()).collect();
    Ok(Some(files))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::EngineConfig;
  use stack_test_utils::TestRepo;

  fn ops(repo: &TestRepo) -> StackOps {
    StackOps::new(EngineConfig::new(repo.path().to_str().unwrap().to_string(), "main"))
  }

  #[test]
  fn rebase_onto_base_replays_stack_on_moved_integration_branch() {
    let repo = TestRepo::new();
    let base = repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    repo.create_commit("first", "b.txt", "1");
    repo.create_commit("second", "c.txt", "2");

    repo.checkout("main").unwrap();
    repo.create_commit("upstream change", "d.txt", "upstream");
    repo.checkout("master").unwrap();
    let _ = base;

    let engine = ops(&repo);
    let report = engine.rebase_onto_base(None).unwrap();
    assert!(report.rebased);

    let parents = engine.store.get_parents("HEAD").unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(repo.read_file("d.txt"), "upstream");
    assert_eq!(repo.read_file("b.txt"), "1");
    assert_eq!(repo.read_file("c.txt"), "2");
  }

  #[test]
  fn rebase_onto_base_refuses_when_working_tree_is_dirty() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    repo.create_commit("first", "b.txt", "1");
    std::fs::write(repo.path().join("a.txt"), "dirty").unwrap();

    let engine = ops(&repo);
    match engine.rebase_onto_base(None) {
      Err(StackOpsError::DirtyWorkingTree { files }) => assert_eq!(files, vec!["a.txt".to_string()]),
      other => panic!("expected DirtyWorkingTree, got {other:?}"),
    }
  }

  #[test]
  fn rebase_onto_base_detects_an_already_in_progress_rebase() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    repo.create_commit("first", "b.txt", "1");
    std::fs::create_dir(repo.path().join(".git").join("rebase-merge")).unwrap();

    let engine = ops(&repo);
    match engine.rebase_onto_base(None) {
      Err(StackOpsError::InProgress { .. }) => {}
      other => panic!("expected InProgress, got {other:?}"),
    }
  }
}
