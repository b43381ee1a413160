use crate::chain::ChainRewrite;
use crate::error::{Result, RewriteEngineError};
use indexmap::IndexMap;
use object_store::{MergeOutcome, ObjectStore};
use tracing::{debug, instrument};

/// Replays `commits` (oldest first) on top of `onto` using simulated
/// three-way merges against each commit's *original* parent, never touching
/// the index or working tree. Halts atomically on the first conflict: no ref
/// or working-tree state changes before that point is surfaced.
///
/// As a fast path, when a commit's original parent tree already matches the
/// tip built so far, the merge is skipped and the commit's own tree is
/// reused directly — the parent's content relative to the new base hasn't
/// changed, so there is nothing to merge.
#[instrument(skip(store, commits))]
pub fn rebase_onto(store: &ObjectStore, onto: &str, commits: &[String]) -> Result<ChainRewrite> {
  if commits.is_empty() {
    return Ok(ChainRewrite { mapping: IndexMap::new(), new_tip: onto.to_string() });
  }

  let mut current_tip = onto.to_string();
  let mut mapping = IndexMap::new();

  for commit in commits {
    let parents = store.get_parents(commit)?;
    let original_parent = parents.first().cloned();

    let tip_tree = store.get_tree(&current_tip)?;
    let commit_tree = store.get_tree(commit)?;

    let tree = match &original_parent {
      Some(parent) if store.get_tree(parent)? == tip_tree => {
        debug!(commit, "parent tree unchanged relative to new base, reusing commit tree");
        commit_tree
      }
      Some(parent) => match store.merge_tree(parent, &current_tip, commit)? {
        MergeOutcome::Clean(tree) => tree,
        MergeOutcome::Conflict(detail) => return Err(RewriteEngineError::Conflict { at: commit.clone(), detail }),
      },
      None => commit_tree,
    };

    let identity = store.get_author_and_committer(commit)?.with_fresh_committer();
    let message = store.get_message(commit)?;
    let new_commit = store.create_commit(&tree, &[current_tip.clone()], &message, &identity)?;

    mapping.insert(commit.clone(), new_commit.clone());
    current_tip = new_commit;
  }

  Ok(ChainRewrite { mapping, new_tip: current_tip })
}

#[cfg(test)]
mod tests {
  use super::*;
  use git_executor::git_command_executor::GitCommandExecutor;
  use stack_test_utils::{ConflictTestBuilder, TestRepo};

  fn store(repo: &TestRepo) -> ObjectStore {
    ObjectStore::new(GitCommandExecutor::new(), repo.path().to_str().unwrap().to_string())
  }

  #[test]
  fn empty_commits_returns_onto_unchanged() {
    let repo = TestRepo::new();
    let onto = repo.create_commit("onto", "a.txt", "0");
    let store = store(&repo);
    let result = rebase_onto(&store, &onto, &[]).unwrap();
    assert_eq!(result.new_tip, onto);
    assert!(result.mapping.is_empty());
  }

  #[test]
  fn clean_replay_preserves_parent_chain_and_author() {
    let repo = TestRepo::new();
    let base = repo.create_commit("base", "shared.txt", "base");
    let first = repo.create_commit_with_files("first", &[("a.txt", "1")]);
    let second = repo.create_commit_with_files("second", &[("b.txt", "2")]);

    repo.reset_hard(&base).unwrap();
    let onto = repo.create_commit_with_files("onto", &[("c.txt", "onto-change")]);

    let store = store(&repo);
    let result = rebase_onto(&store, &onto, &[first.clone(), second.clone()]).unwrap();

    assert_eq!(result.mapping.len(), 2);
    let new_first = &result.mapping[&first];
    let new_second = &result.mapping[&second];
    assert_eq!(&result.new_tip, new_second);
    assert_eq!(store.get_parents(new_first).unwrap(), vec![onto.clone()]);
    assert_eq!(store.get_parents(new_second).unwrap(), vec![new_first.clone()]);

    let files = repo.get_files_in_commit(new_second);
    assert!(files.contains(&"a.txt".to_string()));
    assert!(files.contains(&"b.txt".to_string()));
    assert!(files.contains(&"c.txt".to_string()));

    let identity_before = store.get_author_and_committer(&first).unwrap();
    let identity_after = store.get_author_and_committer(new_first).unwrap();
    assert_eq!(identity_before.author_name, identity_after.author_name);
    assert_eq!(identity_before.author_date, identity_after.author_date);
  }

  #[test]
  fn conflicting_replay_halts_without_mutating_anything() {
    let repo = TestRepo::new();
    let scenario = ConflictTestBuilder::new(&repo)
      .with_initial_state(&[("a.txt", "base")])
      .with_target_changes(&[("a.txt", "onto-version")])
      .with_cherry_changes(&[("a.txt", "commit-version")])
      .build();

    let store = store(&repo);
    let branch_ref = "refs/heads/master";
    let pre_tip = store.resolve_short(branch_ref).unwrap();

    match rebase_onto(&store, &scenario.target_commit, &[scenario.cherry_commit.clone()]) {
      Err(RewriteEngineError::Conflict { at, .. }) => assert_eq!(at, scenario.cherry_commit),
      other => panic!("expected Conflict, got {other:?}"),
    }

    assert_eq!(store.resolve_short(branch_ref).unwrap(), pre_tip);
  }

  #[test]
  fn fast_path_skips_merge_when_parent_tree_matches_new_base() {
    let repo = TestRepo::new();
    let base = repo.create_commit("base", "a.txt", "base");
    let commit = repo.create_commit_with_files("change", &[("b.txt", "new-file")]);
    let store = store(&repo);

    // onto == base's tree, so replaying `commit` onto `base` should reuse
    // commit's own tree with no merge-tree call producing a different tree.
    let result = rebase_onto(&store, &base, &[commit.clone()]).unwrap();
    assert_eq!(store.get_tree(&result.new_tip).unwrap(), store.get_tree(&commit).unwrap());
  }
}
