/// Result of `inject_ids`. A no-op call (every commit already had an id, or
/// the stack is empty) reports `modified == 0` and leaves the branch ref
/// untouched — `finalize` is never even called in that case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectIdsReport {
  pub modified: usize,
  pub rebased: bool,
}

/// Result of `apply_group_spec`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyGroupSpecReport {
  pub reordered: bool,
  pub messages_rewritten: usize,
  pub groups_created: Vec<String>,
}

/// Result of `dissolve_group`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DissolveGroupReport {
  pub commits_touched: usize,
  pub inherited_by: Option<String>,
  pub reassigned_donor_id: Option<String>,
}

/// Result of `remove_all_group_trailers`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveAllGroupTrailersReport {
  pub commits_touched: usize,
  pub groups_purged: Vec<String>,
}

/// Result of `rebase_onto_base`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebaseOntoBaseReport {
  pub rebased: bool,
  pub base: String,
}
