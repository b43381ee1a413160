use std::fmt;

/// Errors surfaced by reading (D) or folding (E) the stack. These are
/// structural: something about the commit range itself doesn't fit the
/// stacked-PR shape, independent of any rewrite being attempted.
#[derive(Debug)]
pub enum StackError {
  /// The configured integration branch doesn't resolve to anything.
  NoIntegrationBranch { branch: String },
  /// The same `Group` id appears in two non-adjacent runs of commits.
  SplitGroup { group: String },
  /// Strict mode is on and a commit outside any group has no `Commit-Id`.
  MissingId { commit: String },
  /// The same unit id is carried by two different commits or groups.
  DuplicateId { id: String, first: String, second: String },
  Io(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StackError>;

impl fmt::Display for StackError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StackError::NoIntegrationBranch { branch } => write!(f, "integration branch {branch} does not resolve"),
      StackError::SplitGroup { group } => write!(f, "group {group} is split across non-adjacent commits"),
      StackError::MissingId { commit } => write!(f, "commit {commit} has no Commit-Id trailer"),
      StackError::DuplicateId { id, first, second } => write!(f, "id {id} is carried by both {first} and {second}"),
      StackError::Io(e) => write!(f, "{e}"),
    }
  }
}

impl std::error::Error for StackError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      StackError::Io(e) => e.source(),
      _ => None,
    }
  }
}

impl From<anyhow::Error> for StackError {
  fn from(err: anyhow::Error) -> Self {
    StackError::Io(err)
  }
}

impl From<trailers::TrailersError> for StackError {
  fn from(err: trailers::TrailersError) -> Self {
    match err {
      trailers::TrailersError::Io(e) => StackError::Io(e),
    }
  }
}
