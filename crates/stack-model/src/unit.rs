/// A reviewable unit of the stack: either a single commit carrying its own
/// `Commit-Id`, or a run of adjacent commits sharing one `Group` id.
/// Deliberately a closed enum rather than a trait object — callers are
/// expected to match on it, not extend it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrUnit {
  Single { id: String, title: String, commit: String },
  Group { id: String, title: String, commits: Vec<String> },
}

impl PrUnit {
  pub fn id(&self) -> &str {
    match self {
      PrUnit::Single { id, .. } | PrUnit::Group { id, .. } => id,
    }
  }

  pub fn title(&self) -> &str {
    match self {
      PrUnit::Single { title, .. } | PrUnit::Group { title, .. } => title,
    }
  }

  pub fn commits(&self) -> Vec<&str> {
    match self {
      PrUnit::Single { commit, .. } => vec![commit.as_str()],
      PrUnit::Group { commits, .. } => commits.iter().map(String::as_str).collect(),
    }
  }
}
