use crate::config::EngineConfig;
use crate::error::{Result, StackOpsError};
use crate::id::generate_id;
use crate::ref_resolve::resolve_ref;
use crate::reports::{ApplyGroupSpecReport, InjectIdsReport};
use crate::spec::GroupSpec;
use git_executor::git_command_executor::GitCommandExecutor;
use object_store::ObjectStore;
use rewrite_engine::{finalize, rebase_onto, rewrite_chain};
use sideband::{Namespace, SideBand};
use stack_model::{CommitRecord, ParseOptions, PrUnit};
use std::collections::{HashMap, HashSet};
use trailers::TrailerCodec;
use tracing::instrument;

/// The orchestrator (component I): every public stack operation is a method
/// here, each a transactional composition of the rewrite engine (F/G/H)
/// plus side-band updates. Holds one of each lower-layer collaborator,
/// already wired to the same repository path.
pub struct StackOps {
  pub(crate) git: GitCommandExecutor,
  pub(crate) store: ObjectStore,
  pub(crate) trailers: TrailerCodec,
  pub(crate) sideband: SideBand,
  pub(crate) config: EngineConfig,
}

impl StackOps {
  pub fn new(config: EngineConfig) -> Self {
    let git = GitCommandExecutor::new();
    let store = ObjectStore::new(git.clone(), config.repo_path.clone());
    let trailers = TrailerCodec::new(git.clone(), config.repo_path.clone());
    let sideband = SideBand::new(git.clone(), config.repo_path.clone(), config.sideband_ref.clone());
    Self { git, store, trailers, sideband, config }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Rejects detached HEAD. Every public operation starts here.
  pub(crate) fn current_branch(&self) -> Result<String> {
    match self.git.execute_command(&["symbolic-ref", "--short", "HEAD"], &self.config.repo_path) {
      Ok(branch) if !branch.trim().is_empty() => Ok(branch.trim().to_string()),
      _ => Err(StackOpsError::DetachedHead),
    }
  }

  pub(crate) fn version_check(&self) -> Result<()> {
    self.store.version_check(self.config.min_git_version)?;
    Ok(())
  }

  pub(crate) fn load_commits(&self) -> Result<Vec<CommitRecord>> {
    Ok(stack_model::read_stack(&self.git, &self.config.repo_path, &self.config.integration_branch, &self.trailers)?)
  }

  /// Parses the current stack into units, non-strict (callers that need the
  /// strict `MissingId` check pass `ParseOptions { strict: true }`
  /// explicitly; most orchestrator operations don't require every commit to
  /// already carry an id, since that's exactly what `inject_ids` fixes).
  pub(crate) fn load_units(&self, commits: &[CommitRecord], options: ParseOptions) -> Result<Vec<PrUnit>> {
    let side_band_titles = self.sideband.read()?.groups;
    Ok(stack_model::parse_stack(commits, &side_band_titles, options)?)
  }

  fn fork_point(&self, commits: &[CommitRecord]) -> Result<String> {
    let first = commits.first().expect("caller checked commits is non-empty");
    let parents = self.store.get_parents(&first.hash)?;
    Ok(parents.into_iter().next().unwrap_or_default())
  }

  /// For every commit lacking a `Commit-Id` — group member or not, per
  /// invariant 4 ("every commit in the stack carries a `Commit-Id`") — mints
  /// a fresh id and appends it as a trailer. A group's unit-level id still
  /// comes from its `Group` trailer (see §3); this only fills in the
  /// per-commit id every commit carries independently of that. No-op when
  /// every commit already has one, or when the stack is empty.
  #[instrument(skip(self))]
  pub fn inject_ids(&self) -> Result<InjectIdsReport> {
    let branch = self.current_branch()?;
    self.version_check()?;
    let commits = self.load_commits()?;
    if commits.is_empty() {
      return Ok(InjectIdsReport::default());
    }

    let mut existing_ids: HashSet<String> = HashSet::new();
    for commit in &commits {
      if let Some(id) = commit.commit_id() {
        existing_ids.insert(id.to_string());
      }
      if let Some(group) = commit.group() {
        existing_ids.insert(group.to_string());
      }
    }

    let mut rewrites: HashMap<String, String> = HashMap::new();
    for commit in &commits {
      if commit.commit_id().is_some() {
        continue;
      }
      let id = generate_id(&existing_ids);
      existing_ids.insert(id.clone());
      let new_body = self.trailers.add(&commit.body, &[("Commit-Id", &id)])?;
      rewrites.insert(commit.hash.clone(), new_body);
    }

    if rewrites.is_empty() {
      return Ok(InjectIdsReport::default());
    }

    let modified = rewrites.len();
    let order: Vec<String> = commits.iter().map(|c| c.hash.clone()).collect();
    let original_tip = order.last().expect("non-empty").clone();

    let chain = rewrite_chain(&self.store, &order, &rewrites)?;
    finalize(&self.store, &branch, &original_tip, &chain.new_tip)?;

    Ok(InjectIdsReport { modified, rebased: false })
  }

  /// Forms, dissolves membership of, and reorders groups in one pass. See
  /// §4.I: resolve every reference, validate contiguity/overlap, reorder via
  /// the plumbing rebase if the caller asked for a different order, rewrite
  /// messages, finalize, then persist fresh group titles.
  #[instrument(skip(self, spec))]
  pub fn apply_group_spec(&self, spec: &GroupSpec) -> Result<ApplyGroupSpecReport> {
    let branch = self.current_branch()?;
    self.version_check()?;
    let commits = self.load_commits()?;
    if commits.is_empty() {
      return Ok(ApplyGroupSpecReport::default());
    }

    // Gathered straight off the raw trailers, not through `parse_stack`:
    // a caller repairing a split group (`merge_split_group`) hands us a
    // stack that wouldn't parse cleanly until after this call rewrites it.
    let mut existing_ids: HashSet<String> = HashSet::new();
    for commit in &commits {
      if let Some(id) = commit.commit_id() {
        existing_ids.insert(id.to_string());
      }
      if let Some(group) = commit.group() {
        existing_ids.insert(group.to_string());
      }
    }

    let original_order: Vec<String> = commits.iter().map(|c| c.hash.clone()).collect();
    let original_set: HashSet<&str> = original_order.iter().map(String::as_str).collect();

    // Resolve every group member reference and assign/generate each group's id.
    let mut target_group_of: HashMap<String, String> = HashMap::new();
    let mut resolved_groups: Vec<(String, String, Vec<String>)> = Vec::new(); // (id, name, member hashes)
    for group in &spec.groups {
      let member_hashes: Vec<String> = group.commits.iter().map(|r| resolve_ref(&commits, r)).collect::<Result<_>>()?;
      let id = match &group.id {
        Some(id) => id.clone(),
        None => {
          let fresh = generate_id(&existing_ids);
          existing_ids.insert(fresh.clone());
          fresh
        }
      };
      for hash in &member_hashes {
        if let Some(prior) = target_group_of.insert(hash.clone(), id.clone())
          && prior != id
        {
          return Err(StackOpsError::GroupOverlap { commit: hash.clone(), first_group: prior, second_group: id });
        }
      }
      resolved_groups.push((id, group.name.clone(), member_hashes));
    }

    // Resolve the final order (defaults to the current one).
    let final_order: Vec<String> = match &spec.order {
      Some(order) => order.iter().map(|r| resolve_ref(&commits, r)).collect::<Result<_>>()?,
      None => original_order.clone(),
    };
    if final_order.len() != original_order.len() || !final_order.iter().all(|h| original_set.contains(h.as_str())) {
      return Err(StackOpsError::Io(anyhow::anyhow!("order must be a permutation of the current stack")));
    }

    // Validate contiguity: each group's members must occupy a contiguous
    // run of `final_order`.
    for (id, _, member_hashes) in &resolved_groups {
      let positions: Vec<usize> = final_order.iter().enumerate().filter(|(_, h)| member_hashes.contains(h)).map(|(i, _)| i).collect();
      if positions.is_empty() {
        continue;
      }
      let span = positions.last().unwrap() - positions.first().unwrap() + 1;
      if span != positions.len() {
        return Err(StackOpsError::NonContiguous { group: id.clone() });
      }
    }

    // Compose message rewrites: any commit whose target group membership
    // differs from its current `Group` trailer value.
    let mut rewrites: HashMap<String, String> = HashMap::new();
    for commit in &commits {
      let current = commit.group().map(str::to_string);
      let target = target_group_of.get(&commit.hash).cloned();
      if current == target {
        continue;
      }
      let stripped = self.trailers.strip_prefix(&commit.body, "Group")?;
      let new_body = match &target {
        Some(id) => self.trailers.add(&stripped, &[("Group", id)])?,
        None => stripped,
      };
      rewrites.insert(commit.hash.clone(), new_body);
    }

    let messages_rewritten = rewrites.len();
    let reordered = final_order != original_order;
    let original_tip = original_order.last().expect("non-empty").clone();

    let new_tip = if reordered {
      let fork_point = self.fork_point(&commits)?;
      let rebased = rebase_onto(&self.store, &fork_point, &final_order)?;
      let remapped_rewrites: HashMap<String, String> = rewrites.into_iter().map(|(old, msg)| (rebased.mapping[&old].clone(), msg)).collect();
      let reordered_commits: Vec<String> = final_order.iter().map(|h| rebased.mapping[h].clone()).collect();
      let chain = rewrite_chain(&self.store, &reordered_commits, &remapped_rewrites)?;
      chain.new_tip
    } else if !rewrites.is_empty() {
      let chain = rewrite_chain(&self.store, &final_order, &rewrites)?;
      chain.new_tip
    } else {
      original_tip.clone()
    };

    if new_tip != original_tip {
      finalize(&self.store, &branch, &original_tip, &new_tip)?;
    }

    let mut groups_created = Vec::new();
    for (id, name, _) in &resolved_groups {
      self.sideband.set(Namespace::Groups, id, name)?;
      groups_created.push(id.clone());
    }

    Ok(ApplyGroupSpecReport { reordered, messages_rewritten, groups_created })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::spec::GroupMember;
  use regex::Regex;
  use stack_test_utils::TestRepo;

  fn ops(repo: &TestRepo) -> StackOps {
    StackOps::new(EngineConfig::new(repo.path().to_str().unwrap().to_string(), "main"))
  }

  fn setup_two_commit_stack(repo: &TestRepo) -> (String, String) {
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    let a = repo.create_commit("A", "a.txt", "1");
    let b = repo.create_commit("B", "a.txt", "2");
    (a, b)
  }

  #[test]
  fn inject_ids_assigns_fresh_ids_preserving_subjects_and_tree() {
    let repo = TestRepo::new();
    let (_a, b) = setup_two_commit_stack(&repo);
    let engine = ops(&repo);

    let report = engine.inject_ids().unwrap();
    assert_eq!(report.modified, 2);

    let commits = engine.load_commits().unwrap();
    let hex8 = Regex::new(r"^[0-9a-f]{8}$").unwrap();
    assert_eq!(commits[0].subject, "A");
    assert_eq!(commits[1].subject, "B");
    assert!(hex8.is_match(commits[0].commit_id().unwrap()));
    assert!(hex8.is_match(commits[1].commit_id().unwrap()));
    assert_ne!(commits[0].commit_id(), commits[1].commit_id());
    assert_eq!(repo.read_file("a.txt"), "2");
    assert_ne!(repo.head(), b);
  }

  #[test]
  fn inject_ids_preserves_existing_id_and_mints_the_other() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    repo.create_commit("A\n\nCommit-Id: existing1", "a.txt", "1");
    repo.create_commit("B", "a.txt", "2");
    let engine = ops(&repo);

    let report = engine.inject_ids().unwrap();
    assert_eq!(report.modified, 1);

    let commits = engine.load_commits().unwrap();
    assert_eq!(commits[0].commit_id(), Some("existing1"));
    assert_ne!(commits[1].commit_id(), Some("existing1"));
    assert!(commits[1].commit_id().is_some());
  }

  #[test]
  fn inject_ids_is_a_noop_when_every_commit_already_has_an_id() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    repo.create_commit("A\n\nCommit-Id: aaaaaaaa", "a.txt", "1");
    let engine = ops(&repo);
    let head_before = repo.head();

    let report = engine.inject_ids().unwrap();
    assert_eq!(report.modified, 0);
    assert_eq!(repo.head(), head_before);
  }

  #[test]
  fn inject_ids_mints_ids_for_group_member_commits_too() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    let h1 = repo.create_commit("first", "a.txt", "1");
    let h2 = repo.create_commit("second", "a.txt", "2");
    let engine = ops(&repo);

    let spec = GroupSpec { order: None, groups: vec![GroupMember { commits: vec![h1, h2], name: "G".to_string(), id: None }] };
    engine.apply_group_spec(&spec).unwrap();

    let report = engine.inject_ids().unwrap();
    assert_eq!(report.modified, 2);

    let commits = engine.load_commits().unwrap();
    let hex8 = Regex::new(r"^[0-9a-f]{8}$").unwrap();
    assert!(commits.iter().all(|c| c.group().is_some()));
    assert!(commits.iter().all(|c| c.commit_id().is_some_and(|id| hex8.is_match(id))));
    assert_ne!(commits[0].commit_id(), commits[1].commit_id());
  }

  #[test]
  fn apply_group_spec_forms_contiguous_group() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    let h1 = repo.create_commit("first", "a.txt", "1");
    let h2 = repo.create_commit("second", "a.txt", "2");
    let h3 = repo.create_commit("third", "a.txt", "3");
    let engine = ops(&repo);

    let spec = GroupSpec { order: None, groups: vec![GroupMember { commits: vec![h1, h2, h3], name: "G".to_string(), id: None }] };
    let report = engine.apply_group_spec(&spec).unwrap();
    assert_eq!(report.groups_created.len(), 1);
    let group_id = report.groups_created[0].clone();

    let units = engine.load_units(&engine.load_commits().unwrap(), ParseOptions::default()).unwrap();
    assert_eq!(units.len(), 1);
    match &units[0] {
      PrUnit::Group { id, title, commits } => {
        assert_eq!(id, &group_id);
        assert_eq!(title, "G");
        assert_eq!(commits.len(), 3);
      }
      other => panic!("expected a Group unit, got {other:?}"),
    }
    assert_eq!(engine.sideband.read().unwrap().groups.get(&group_id).cloned(), Some("G".to_string()));
  }

  #[test]
  fn apply_group_spec_rejects_non_contiguous_membership() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    let h1 = repo.create_commit("first", "a.txt", "1");
    let _h2 = repo.create_commit("second", "a.txt", "2");
    let h3 = repo.create_commit("third", "a.txt", "3");
    let engine = ops(&repo);
    let head_before = repo.head();

    let spec = GroupSpec { order: None, groups: vec![GroupMember { commits: vec![h1, h3], name: "Bad".to_string(), id: None }] };
    match engine.apply_group_spec(&spec) {
      Err(StackOpsError::NonContiguous { .. }) => {}
      other => panic!("expected NonContiguous, got {other:?}"),
    }
    assert_eq!(repo.head(), head_before);
  }
}
