/// One group the caller wants formed, as part of an `apply-group-spec` call.
/// `commits` are references (full hash, 7-or-8-char prefix, or `Commit-Id`);
/// `id` pins the group's identifier instead of minting a fresh one — used by
/// repair paths (`merge-split-group`, `remove-all-group-trailers`) that must
/// preserve an existing id rather than generate a new one.
#[derive(Debug, Clone)]
pub struct GroupMember {
  pub commits: Vec<String>,
  pub name: String,
  pub id: Option<String>,
}

/// The full shape of an `apply-group-spec` call: an optional reordering of
/// the whole stack, plus the groups to form. Commits not mentioned in any
/// group become (or remain) `Single` units.
#[derive(Debug, Clone, Default)]
pub struct GroupSpec {
  pub order: Option<Vec<String>>,
  pub groups: Vec<GroupMember>,
}
