use crate::commit::CommitRecord;
use crate::error::{Result, StackError};
use crate::unit::PrUnit;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Knobs the caller can set when folding an annotated commit list into
/// `PrUnit`s. `strict` corresponds to the `missing-id` error kind: callers
/// that are about to rely on every unit carrying a stable id (anything past
/// `inject-ids`) should set it; `inject-ids` itself parses non-strict so it
/// can see which commits still need an id minted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
  pub strict: bool,
}

/// Reduces `commits` (oldest first, trailers already parsed) into an ordered
/// list of PR units, validating the structural invariants from the data
/// model: group contiguity, and id uniqueness across both single commits and
/// groups. `side_band_titles` is the side-band store's `groups` namespace,
/// already resolved by the caller — this crate has no dependency on the
/// side-band crate itself, to keep the fold a pure function of its inputs.
pub fn parse_stack(commits: &[CommitRecord], side_band_titles: &IndexMap<String, String>, options: ParseOptions) -> Result<Vec<PrUnit>> {
  let mut units = Vec::new();
  let mut finished_groups: HashSet<String> = HashSet::new();
  let mut id_origin: HashMap<String, String> = HashMap::new();

  let mut current_group: Option<String> = None;
  let mut current_commits: Vec<String> = Vec::new();

  for commit in commits {
    match commit.group() {
      Some(g) => {
        if current_group.as_deref() == Some(g) {
          current_commits.push(commit.hash.clone());
          continue;
        }
        if let Some(prev) = current_group.take() {
          flush_group(&prev, std::mem::take(&mut current_commits), commits, side_band_titles, &mut finished_groups, &mut id_origin, &mut units)?;
        }
        if finished_groups.contains(g) {
          return Err(StackError::SplitGroup { group: g.to_string() });
        }
        current_group = Some(g.to_string());
        current_commits = vec![commit.hash.clone()];
      }
      None => {
        if let Some(prev) = current_group.take() {
          flush_group(&prev, std::mem::take(&mut current_commits), commits, side_band_titles, &mut finished_groups, &mut id_origin, &mut units)?;
        }
        let id = match commit.commit_id() {
          Some(id) => id.to_string(),
          None if options.strict => return Err(StackError::MissingId { commit: commit.hash.clone() }),
          None => commit.hash.clone(),
        };
        check_and_record_id(&id, &commit.hash, &mut id_origin)?;
        units.push(PrUnit::Single { id, title: commit.subject.clone(), commit: commit.hash.clone() });
      }
    }
  }
  if let Some(prev) = current_group.take() {
    flush_group(&prev, current_commits, commits, side_band_titles, &mut finished_groups, &mut id_origin, &mut units)?;
  }

  Ok(units)
}

#[allow(clippy::too_many_arguments)]
fn flush_group(
  group_id: &str,
  member_hashes: Vec<String>,
  all_commits: &[CommitRecord],
  side_band_titles: &IndexMap<String, String>,
  finished_groups: &mut HashSet<String>,
  id_origin: &mut HashMap<String, String>,
  units: &mut Vec<PrUnit>,
) -> Result<()> {
  finished_groups.insert(group_id.to_string());
  check_and_record_id(group_id, member_hashes.first().map(String::as_str).unwrap_or(group_id), id_origin)?;
  let title = group_title(group_id, &member_hashes, all_commits, side_band_titles);
  units.push(PrUnit::Group { id: group_id.to_string(), title, commits: member_hashes });
  Ok(())
}

fn group_title(group_id: &str, member_hashes: &[String], all_commits: &[CommitRecord], side_band_titles: &IndexMap<String, String>) -> String {
  if let Some(title) = side_band_titles.get(group_id) {
    return title.clone();
  }
  let members: Vec<&CommitRecord> = all_commits.iter().filter(|c| member_hashes.contains(&c.hash)).collect();
  for member in &members {
    if let Some(title) = member.group_title_trailer() {
      return title.to_string();
    }
  }
  members.first().map(|c| c.subject.clone()).unwrap_or_default()
}

fn check_and_record_id(id: &str, origin: &str, id_origin: &mut HashMap<String, String>) -> Result<()> {
  if let Some(first) = id_origin.get(id) {
    return Err(StackError::DuplicateId { id: id.to_string(), first: first.clone(), second: origin.to_string() });
  }
  id_origin.insert(id.to_string(), origin.to_string());
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use indexmap::IndexMap;

  fn commit(hash: &str, subject: &str, trailers: &[(&str, &str)]) -> CommitRecord {
    CommitRecord {
      hash: hash.to_string(),
      subject: subject.to_string(),
      body: subject.to_string(),
      trailers: trailers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    }
  }

  #[test]
  fn singles_without_groups_fold_one_to_one() {
    let commits = vec![commit("h1", "A", &[("Commit-Id", "aaaaaaaa")]), commit("h2", "B", &[("Commit-Id", "bbbbbbbb")])];
    let units = parse_stack(&commits, &IndexMap::new(), ParseOptions::default()).unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].id(), "aaaaaaaa");
    assert_eq!(units[1].id(), "bbbbbbbb");
  }

  #[test]
  fn contiguous_group_folds_into_one_unit() {
    let commits = vec![
      commit("h1", "A", &[("Group", "g1")]),
      commit("h2", "B", &[("Group", "g1")]),
      commit("h3", "C", &[("Commit-Id", "cccccccc")]),
    ];
    let units = parse_stack(&commits, &IndexMap::new(), ParseOptions::default()).unwrap();
    assert_eq!(units.len(), 2);
    match &units[0] {
      PrUnit::Group { id, commits, .. } => {
        assert_eq!(id, "g1");
        assert_eq!(commits, &vec!["h1".to_string(), "h2".to_string()]);
      }
      other => panic!("expected group, got {other:?}"),
    }
  }

  #[test]
  fn interleaved_group_is_split_group_error() {
    let commits = vec![
      commit("h1", "A", &[("Group", "g1")]),
      commit("h2", "B", &[("Commit-Id", "bbbbbbbb")]),
      commit("h3", "C", &[("Group", "g1")]),
    ];
    match parse_stack(&commits, &IndexMap::new(), ParseOptions::default()) {
      Err(StackError::SplitGroup { group }) => assert_eq!(group, "g1"),
      other => panic!("expected SplitGroup, got {other:?}"),
    }
  }

  #[test]
  fn two_distinct_adjacent_groups_parse_cleanly() {
    // g1 closes (implicitly, by g2 starting) before g2 opens; neither group
    // ever reappears afterward, so this is just two adjacent groups, not a
    // split -- distinct from the interleaved-reuse case above.
    let commits = vec![commit("h1", "A", &[("Group", "g1")]), commit("h2", "B", &[("Group", "g2")])];
    let units = parse_stack(&commits, &IndexMap::new(), ParseOptions::default()).unwrap();
    assert_eq!(units.len(), 2);
  }

  #[test]
  fn missing_id_in_strict_mode_errors() {
    let commits = vec![commit("h1", "A", &[])];
    match parse_stack(&commits, &IndexMap::new(), ParseOptions { strict: true }) {
      Err(StackError::MissingId { commit }) => assert_eq!(commit, "h1"),
      other => panic!("expected MissingId, got {other:?}"),
    }
  }

  #[test]
  fn missing_id_in_non_strict_mode_falls_back_to_hash() {
    let commits = vec![commit("h1", "A", &[])];
    let units = parse_stack(&commits, &IndexMap::new(), ParseOptions::default()).unwrap();
    assert_eq!(units[0].id(), "h1");
  }

  #[test]
  fn duplicate_ids_across_singles_are_rejected() {
    let commits = vec![commit("h1", "A", &[("Commit-Id", "aaaaaaaa")]), commit("h2", "B", &[("Commit-Id", "aaaaaaaa")])];
    match parse_stack(&commits, &IndexMap::new(), ParseOptions::default()) {
      Err(StackError::DuplicateId { id, .. }) => assert_eq!(id, "aaaaaaaa"),
      other => panic!("expected DuplicateId, got {other:?}"),
    }
  }

  #[test]
  fn group_title_prefers_side_band_then_legacy_trailer_then_subject() {
    let commits = vec![commit("h1", "First subject", &[("Group", "g1"), ("Group-Title", "Legacy Title")])];
    let units = parse_stack(&commits, &IndexMap::new(), ParseOptions::default()).unwrap();
    assert_eq!(units[0].title(), "Legacy Title");

    let mut side_band = IndexMap::new();
    side_band.insert("g1".to_string(), "Side-band Title".to_string());
    let units = parse_stack(&commits, &side_band, ParseOptions::default()).unwrap();
    assert_eq!(units[0].title(), "Side-band Title");

    let commits_no_legacy = vec![commit("h1", "First subject", &[("Group", "g1")])];
    let units = parse_stack(&commits_no_legacy, &IndexMap::new(), ParseOptions::default()).unwrap();
    assert_eq!(units[0].title(), "First subject");
  }
}
