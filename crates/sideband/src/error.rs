use std::fmt;

#[derive(Debug)]
pub enum SideBandError {
  Io(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SideBandError>;

impl fmt::Display for SideBandError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SideBandError::Io(e) => write!(f, "{e}"),
    }
  }
}

impl std::error::Error for SideBandError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      SideBandError::Io(e) => e.source(),
    }
  }
}

impl From<anyhow::Error> for SideBandError {
  fn from(err: anyhow::Error) -> Self {
    SideBandError::Io(err)
  }
}
