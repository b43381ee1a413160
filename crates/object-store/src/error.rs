use std::fmt;

/// Primitive-level errors surfaced by the object store. Per the error taxonomy,
/// components above this layer (rewrite-engine, stack-ops) either propagate these
/// verbatim or wrap them with an operation name; they never invent new primitive
/// kinds of their own.
#[derive(Debug)]
pub enum ObjectStoreError {
  /// The discovered `git` binary doesn't support the three-way `merge-tree
  /// --write-tree --merge-base` semantics the engine requires.
  ToolTooOld { found: String, required: (u32, u32) },
  /// `update_ref`'s compare-and-swap lost: `expected` no longer matches what the
  /// ref actually points at.
  RefConflict { reference: String, expected: String, actual: String },
  /// A commit-ish reference could not be resolved to an object.
  ObjectMissing { reference: String },
  /// Anything else: process spawn failure, non-UTF8 output, malformed plumbing
  /// output. Carries the underlying git invocation for diagnosis.
  Io(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ObjectStoreError>;

impl fmt::Display for ObjectStoreError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ObjectStoreError::ToolTooOld { found, required } => {
        write!(f, "git {found} does not support the required merge-tree semantics (need >= {}.{})", required.0, required.1)
      }
      ObjectStoreError::RefConflict { reference, expected, actual } => {
        write!(f, "ref {reference} moved: expected {expected}, found {actual}")
      }
      ObjectStoreError::ObjectMissing { reference } => write!(f, "object not found: {reference}"),
      ObjectStoreError::Io(e) => write!(f, "{e}"),
    }
  }
}

impl std::error::Error for ObjectStoreError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ObjectStoreError::Io(e) => e.source(),
      _ => None,
    }
  }
}

impl From<anyhow::Error> for ObjectStoreError {
  fn from(err: anyhow::Error) -> Self {
    ObjectStoreError::Io(err)
  }
}
