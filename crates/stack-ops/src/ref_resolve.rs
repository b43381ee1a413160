use crate::error::{Result, StackOpsError};
use stack_model::CommitRecord;

/// Resolves a caller-supplied reference — full hash, a 7-or-8-char hex
/// prefix, or a `Commit-Id` — against the commits currently in the stack.
/// Anything that doesn't land on exactly one commit in the stack is
/// `UnknownRef`: this engine never reaches outside the stack range to
/// resolve a ref, per §4.I ("Resolve every reference to a full hash; unknown
/// reference -> UnknownRef").
pub fn resolve_ref(commits: &[CommitRecord], reference: &str) -> Result<String> {
  if let Some(commit) = commits.iter().find(|c| c.hash == reference) {
    return Ok(commit.hash.clone());
  }
  if let Some(commit) = commits.iter().find(|c| c.commit_id() == Some(reference)) {
    return Ok(commit.hash.clone());
  }
  if (7..=8).contains(&reference.len()) && reference.chars().all(|c| c.is_ascii_hexdigit()) {
    let matches: Vec<&CommitRecord> = commits.iter().filter(|c| c.hash.starts_with(reference)).collect();
    if matches.len() == 1 {
      return Ok(matches[0].hash.clone());
    }
  }
  Err(StackOpsError::UnknownRef { reference: reference.to_string() })
}

#[cfg(test)]
mod tests {
  use super::*;
  use indexmap::IndexMap;

  fn commit(hash: &str, commit_id: Option<&str>) -> CommitRecord {
    let mut trailers = IndexMap::new();
    if let Some(id) = commit_id {
      trailers.insert("Commit-Id".to_string(), id.to_string());
    }
    CommitRecord { hash: hash.to_string(), subject: "subject".to_string(), body: "subject".to_string(), trailers }
  }

  #[test]
  fn resolves_full_hash() {
    let commits = vec![commit("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", None)];
    assert_eq!(resolve_ref(&commits, "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap(), commits[0].hash);
  }

  #[test]
  fn resolves_commit_id_trailer() {
    let commits = vec![commit("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", Some("deadbeef"))];
    assert_eq!(resolve_ref(&commits, "deadbeef").unwrap(), commits[0].hash);
  }

  #[test]
  fn resolves_unambiguous_short_prefix() {
    let commits = vec![commit("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", None)];
    assert_eq!(resolve_ref(&commits, "aaaaaaa").unwrap(), commits[0].hash);
  }

  #[test]
  fn prefix_shorter_than_seven_chars_is_not_resolved() {
    let commits = vec![commit("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", None)];
    match resolve_ref(&commits, "aaaaaa") {
      Err(StackOpsError::UnknownRef { reference }) => assert_eq!(reference, "aaaaaa"),
      other => panic!("expected UnknownRef, got {other:?}"),
    }
  }

  #[test]
  fn unresolvable_reference_is_unknown_ref() {
    let commits = vec![commit("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", None)];
    match resolve_ref(&commits, "ffffffff") {
      Err(StackOpsError::UnknownRef { reference }) => assert_eq!(reference, "ffffffff"),
      other => panic!("expected UnknownRef, got {other:?}"),
    }
  }
}
