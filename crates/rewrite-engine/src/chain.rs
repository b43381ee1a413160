use crate::error::{Result, RewriteEngineError};
use indexmap::IndexMap;
use object_store::ObjectStore;
use std::collections::HashMap;
use tracing::instrument;

/// Old-hash -> new-hash mapping plus the new chain's tip, produced by either
/// the chain rewriter (F) or the plumbing rebase (G). Both return the same
/// shape because both are "replay this ordered list of commits, recording
/// where each one landed."
#[derive(Debug, Clone)]
pub struct ChainRewrite {
  pub mapping: IndexMap<String, String>,
  pub new_tip: String,
}

/// Rebuilds `commits` (oldest first) as a fresh chain of commit objects,
/// reusing each original commit's tree and author/committer identity
/// verbatim and substituting `rewrites[c]` for the message where present.
/// The chain stays parented on the same fork point — only messages (and
/// therefore hashes) change, never tree content or ancestry shape.
#[instrument(skip(store, commits, rewrites))]
pub fn rewrite_chain(store: &ObjectStore, commits: &[String], rewrites: &HashMap<String, String>) -> Result<ChainRewrite> {
  let Some(first) = commits.first() else {
    return Err(RewriteEngineError::EmptyChain);
  };

  let mut parent = store.get_parents(first)?.into_iter().next();
  let mut mapping = IndexMap::new();

  for commit in commits {
    let tree = store.get_tree(commit)?;
    let identity = store.get_author_and_committer(commit)?;
    let message = match rewrites.get(commit) {
      Some(m) => m.clone(),
      None => store.get_message(commit)?,
    };
    let parents: Vec<String> = parent.clone().into_iter().collect();
    let new_commit = store.create_commit(&tree, &parents, &message, &identity)?;
    mapping.insert(commit.clone(), new_commit.clone());
    parent = Some(new_commit);
  }

  Ok(ChainRewrite { mapping, new_tip: parent.expect("loop ran at least once since commits is non-empty") })
}

#[cfg(test)]
mod tests {
  use super::*;
  use git_executor::git_command_executor::GitCommandExecutor;
  use stack_test_utils::TestRepo;

  fn store(repo: &TestRepo) -> ObjectStore {
    ObjectStore::new(GitCommandExecutor::new(), repo.path().to_str().unwrap().to_string())
  }

  #[test]
  fn empty_chain_is_rejected() {
    let repo = TestRepo::new();
    let store = store(&repo);
    match rewrite_chain(&store, &[], &HashMap::new()) {
      Err(RewriteEngineError::EmptyChain) => {}
      other => panic!("expected EmptyChain, got {other:?}"),
    }
  }

  #[test]
  fn message_only_rewrite_preserves_tree_and_author() {
    let repo = TestRepo::new();
    let base = repo.create_commit("base", "a.txt", "0");
    let first = repo.create_commit("first", "b.txt", "1");
    let second = repo.create_commit("second", "c.txt", "2");
    let store = store(&repo);

    let mut rewrites = HashMap::new();
    rewrites.insert(first.clone(), "first (reworded)".to_string());

    let result = rewrite_chain(&store, &[first.clone(), second.clone()], &rewrites).unwrap();

    assert_eq!(result.mapping.len(), 2);
    let new_first = &result.mapping[&first];
    let new_second = &result.mapping[&second];
    assert_eq!(&result.new_tip, new_second);

    assert_eq!(store.get_tree(new_first).unwrap(), store.get_tree(&first).unwrap());
    assert_eq!(store.get_tree(new_second).unwrap(), store.get_tree(&second).unwrap());
    assert_eq!(store.get_parents(new_second).unwrap(), vec![new_first.clone()]);
    assert_eq!(store.get_parents(new_first).unwrap(), vec![base]);
    assert_eq!(store.get_message(new_first).unwrap(), "first (reworded)");
    assert_eq!(store.get_message(new_second).unwrap(), "second");

    let identity_before = store.get_author_and_committer(&second).unwrap();
    let identity_after = store.get_author_and_committer(new_second).unwrap();
    assert_eq!(identity_before, identity_after);
  }

  #[test]
  fn empty_rewrites_still_produce_a_fresh_chain() {
    let repo = TestRepo::new();
    let first = repo.create_commit("first", "a.txt", "1");
    let store = store(&repo);

    let result = rewrite_chain(&store, &[first.clone()], &HashMap::new()).unwrap();
    assert_ne!(result.new_tip, first);
    assert_eq!(store.get_tree(&result.new_tip).unwrap(), store.get_tree(&first).unwrap());
  }

  #[test]
  fn root_commit_keeps_no_parent() {
    let repo = TestRepo::new();
    let first = repo.create_commit("first", "a.txt", "1");
    let store = store(&repo);

    let mut rewrites = HashMap::new();
    rewrites.insert(first.clone(), "reworded root".to_string());
    let result = rewrite_chain(&store, &[first.clone()], &rewrites).unwrap();

    assert!(store.get_parents(&result.new_tip).unwrap().is_empty());
  }
}
