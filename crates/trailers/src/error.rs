use std::fmt;

/// Errors surfaced while shelling out to `git interpret-trailers`. There is
/// no "bad trailer syntax" variant: the host tool's parser never rejects
/// input, it just may find nothing to parse.
#[derive(Debug)]
pub enum TrailersError {
  Io(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TrailersError>;

impl fmt::Display for TrailersError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrailersError::Io(e) => write!(f, "{e}"),
    }
  }
}

impl std::error::Error for TrailersError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      TrailersError::Io(e) => e.source(),
    }
  }
}

impl From<anyhow::Error> for TrailersError {
  fn from(err: anyhow::Error) -> Self {
    TrailersError::Io(err)
  }
}
