use indexmap::IndexMap;

/// One commit on the branch, between the fork point and `HEAD`, with its
/// trailers already parsed out of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
  pub hash: String,
  pub subject: String,
  pub body: String,
  pub trailers: IndexMap<String, String>,
}

impl CommitRecord {
  pub fn commit_id(&self) -> Option<&str> {
    self.trailers.get("Commit-Id").map(String::as_str)
  }

  pub fn group(&self) -> Option<&str> {
    self.trailers.get("Group").map(String::as_str)
  }

  /// The legacy per-commit title trailer, superseded by the side-band
  /// group-title map but still honored when no side-band entry exists.
  pub fn group_title_trailer(&self) -> Option<&str> {
    self.trailers.get("Group-Title").map(String::as_str)
  }
}
