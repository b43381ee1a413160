use crate::engine::StackOps;
use crate::error::{Result, StackOpsError};
use crate::id::generate_id;
use crate::ref_resolve::resolve_ref;
use crate::reports::{DissolveGroupReport, RemoveAllGroupTrailersReport};
use crate::spec::{GroupMember, GroupSpec};
use rewrite_engine::{finalize, rewrite_chain};
use sideband::Namespace;
use stack_model::{ParseOptions, PrUnit};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

impl StackOps {
  /// Strips every member commit's `Group`/`Group-Title` trailers, optionally
  /// handing the group's id to one surviving commit (`assign_to`) so a
  /// caller can keep reviewing the unit under its old id as a `Single`. If a
  /// different commit than `assign_to` currently carries `Commit-Id ==
  /// group_id` (the donor that originally lent the group its id), that donor
  /// is given a fresh id so the post-operation stack never has a duplicate.
  #[instrument(skip(self))]
  pub fn dissolve_group(&self, group_id: &str, assign_to: Option<&str>) -> Result<DissolveGroupReport> {
    let branch = self.current_branch()?;
    self.version_check()?;
    let commits = self.load_commits()?;
    let units = self.load_units(&commits, ParseOptions::default())?;

    let group = units
      .iter()
      .find_map(|u| match u {
        PrUnit::Group { id, commits, .. } if id == group_id => Some(commits.clone()),
        _ => None,
      })
      .ok_or_else(|| StackOpsError::GroupNotFound { group: group_id.to_string() })?;
    let member_set: HashSet<&str> = group.iter().map(String::as_str).collect();

    let assign_target = assign_to.map(|r| resolve_ref(&commits, r)).transpose()?;
    if let Some(target) = &assign_target
      && !member_set.contains(target.as_str())
    {
      return Err(StackOpsError::UnknownRef { reference: assign_to.unwrap().to_string() });
    }

    let mut existing_ids: HashSet<String> = units.iter().map(|u| u.id().to_string()).collect();

    // Promoting the group's id to `assign_target`'s Commit-Id could collide
    // with some unrelated commit elsewhere in the stack that already
    // happens to carry that value; give that commit a fresh id first.
    let mut reassigned_donor_id = None;
    let donor_fresh_id = if let Some(target) = &assign_target {
      commits.iter().find(|c| c.commit_id() == Some(group_id) && &c.hash != target).map(|donor| {
        let fresh = generate_id(&existing_ids);
        existing_ids.insert(fresh.clone());
        reassigned_donor_id = Some(fresh.clone());
        (donor.hash.clone(), fresh)
      })
    } else {
      None
    };

    let mut rewrites: HashMap<String, String> = HashMap::new();
    for commit in &commits {
      let in_group = member_set.contains(commit.hash.as_str());
      let is_donor = donor_fresh_id.as_ref().is_some_and(|(hash, _)| hash == &commit.hash);
      if !in_group && !is_donor {
        continue;
      }
      let mut body = if in_group { self.trailers.strip_prefix(&commit.body, "Group")? } else { commit.body.clone() };
      if is_donor {
        let fresh = &donor_fresh_id.as_ref().unwrap().1;
        body = self.trailers.replace(&body, &[("Commit-Id", fresh)])?;
      }
      if let Some(target) = &assign_target
        && &commit.hash == target
      {
        body = self.trailers.replace(&body, &[("Commit-Id", group_id)])?;
      }
      rewrites.insert(commit.hash.clone(), body);
    }

    let commits_touched = rewrites.len();
    let order: Vec<String> = commits.iter().map(|c| c.hash.clone()).collect();
    let original_tip = order.last().expect("group existed, stack non-empty").clone();

    let chain = rewrite_chain(&self.store, &order, &rewrites)?;
    finalize(&self.store, &branch, &original_tip, &chain.new_tip)?;
    self.sideband.delete(Namespace::Groups, group_id)?;

    Ok(DissolveGroupReport { commits_touched, inherited_by: assign_target, reassigned_donor_id })
  }

  /// Reforms a group exactly as it stood before, a thin wrapper around
  /// `apply_group_spec` that reuses the group's existing id and title — a
  /// repair path for a group whose membership was accidentally split by an
  /// intervening rebase elsewhere (§8 S6).
  #[instrument(skip(self))]
  pub fn merge_split_group(&self, group_id: &str) -> Result<()> {
    let commits = self.load_commits()?;

    // A split group fails `parse_stack` by construction (that's the whole
    // point of `SplitGroup`), so membership and title here are read directly
    // off the raw trailers rather than through the unit parser.
    let members: Vec<&stack_model::CommitRecord> = commits.iter().filter(|c| c.group() == Some(group_id)).collect();
    if members.is_empty() {
      return Err(StackOpsError::GroupNotFound { group: group_id.to_string() });
    }
    let side_band_titles = self.sideband.read()?.groups;
    let title = side_band_titles
      .get(group_id)
      .cloned()
      .or_else(|| members.iter().find_map(|c| c.group_title_trailer().map(str::to_string)))
      .unwrap_or_else(|| members[0].subject.clone());
    let member_hashes: Vec<String> = members.iter().map(|c| c.hash.clone()).collect();

    let member_set: HashSet<&str> = member_hashes.iter().map(String::as_str).collect();
    let order: Vec<String> = commits.iter().map(|c| c.hash.clone()).collect();
    let (non_members, members): (Vec<String>, Vec<String>) = order.into_iter().partition(|h| !member_set.contains(h.as_str()));

    let spec = GroupSpec {
      order: Some(non_members.into_iter().chain(members.clone()).collect()),
      groups: vec![GroupMember { commits: members, name: title, id: Some(group_id.to_string()) }],
    };
    self.apply_group_spec(&spec)?;
    Ok(())
  }

  /// Strips every `Group`/`Group-Title` trailer from the entire stack and
  /// purges every group's side-band title. Used to flatten a stack back to
  /// all-`Single` units (§8 S5's inverse, or plain cleanup).
  #[instrument(skip(self))]
  pub fn remove_all_group_trailers(&self) -> Result<RemoveAllGroupTrailersReport> {
    let branch = self.current_branch()?;
    self.version_check()?;
    let commits = self.load_commits()?;
    if commits.is_empty() {
      return Ok(RemoveAllGroupTrailersReport::default());
    }

    let units = self.load_units(&commits, ParseOptions::default())?;
    let groups_purged: Vec<String> = units.iter().filter_map(|u| if let PrUnit::Group { id, .. } = u { Some(id.clone()) } else { None }).collect();

    let mut rewrites: HashMap<String, String> = HashMap::new();
    for commit in &commits {
      if commit.group().is_none() {
        continue;
      }
      let body = self.trailers.strip_prefix(&commit.body, "Group")?;
      rewrites.insert(commit.hash.clone(), body);
    }

    if rewrites.is_empty() {
      return Ok(RemoveAllGroupTrailersReport::default());
    }

    let commits_touched = rewrites.len();
    let order: Vec<String> = commits.iter().map(|c| c.hash.clone()).collect();
    let original_tip = order.last().expect("non-empty").clone();

    let chain = rewrite_chain(&self.store, &order, &rewrites)?;
    finalize(&self.store, &branch, &original_tip, &chain.new_tip)?;
    self.sideband.delete_many(Namespace::Groups, &groups_purged)?;

    Ok(RemoveAllGroupTrailersReport { commits_touched, groups_purged })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::EngineConfig;
  use stack_model::PrUnit;
  use stack_test_utils::TestRepo;

  fn ops(repo: &TestRepo) -> StackOps {
    StackOps::new(EngineConfig::new(repo.path().to_str().unwrap().to_string(), "main"))
  }

  #[test]
  fn dissolve_group_inherits_id_to_chosen_commit() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    repo.create_commit("first\n\nGroup: g1\nCommit-Id: c1", "a.txt", "1");
    let h2 = repo.create_commit("second\n\nGroup: g1\nCommit-Id: c2", "a.txt", "2");
    let engine = ops(&repo);
    engine.sideband.set(sideband::Namespace::Groups, "g1", "G").unwrap();

    let report = engine.dissolve_group("g1", Some(h2.as_str())).unwrap();
    assert_eq!(report.commits_touched, 2);
    assert_eq!(report.inherited_by, Some(h2.clone()));

    let commits = engine.load_commits().unwrap();
    assert!(commits.iter().all(|c| c.group().is_none()));
    assert_eq!(commits[0].commit_id(), Some("c1"));
    assert_eq!(commits[1].commit_id(), Some("g1"));
    assert_eq!(engine.sideband.read().unwrap().groups.get("g1"), None);
  }

  #[test]
  fn merge_split_group_reorders_members_contiguous_preserving_id_and_title() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    repo.create_commit("A\n\nGroup: g1", "a.txt", "1");
    repo.create_commit("B", "a.txt", "2");
    repo.create_commit("C\n\nGroup: g1", "a.txt", "3");
    let engine = ops(&repo);
    engine.sideband.set(sideband::Namespace::Groups, "g1", "Shared feature").unwrap();

    engine.merge_split_group("g1").unwrap();

    let commits = engine.load_commits().unwrap();
    assert_eq!(commits.len(), 3);
    assert_eq!(commits[0].subject, "B");
    assert_eq!(commits[1].subject, "A");
    assert_eq!(commits[2].subject, "C");
    assert_eq!(commits[1].group(), Some("g1"));
    assert_eq!(commits[2].group(), Some("g1"));

    let units = engine.load_units(&commits, stack_model::ParseOptions::default()).unwrap();
    match units.iter().find(|u| u.id() == "g1").unwrap() {
      PrUnit::Group { title, commits, .. } => {
        assert_eq!(title, "Shared feature");
        assert_eq!(commits.len(), 2);
      }
      other => panic!("expected Group, got {other:?}"),
    }
  }

  #[test]
  fn remove_all_group_trailers_flattens_stack_and_purges_sideband() {
    let repo = TestRepo::new();
    repo.create_commit("base", "a.txt", "0");
    repo.create_branch("main").unwrap();
    repo.create_commit("A\n\nGroup: g1", "a.txt", "1");
    repo.create_commit("B\n\nGroup: g1", "a.txt", "2");
    repo.create_commit("C\n\nCommit-Id: cccccccc", "a.txt", "3");
    let engine = ops(&repo);
    engine.sideband.set(sideband::Namespace::Groups, "g1", "G").unwrap();

    let report = engine.remove_all_group_trailers().unwrap();
    assert_eq!(report.commits_touched, 2);
    assert_eq!(report.groups_purged, vec!["g1".to_string()]);

    let commits = engine.load_commits().unwrap();
    assert!(commits.iter().all(|c| c.group().is_none()));
    assert_eq!(engine.sideband.read().unwrap().groups.get("g1"), None);
  }
}
