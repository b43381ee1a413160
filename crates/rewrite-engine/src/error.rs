use object_store::ObjectStoreError;
use std::fmt;

/// Errors this crate surfaces. Per the taxonomy, components F/G/H only ever
/// produce Precondition/Conflict/Concurrency/Integrity kinds — never the
/// Structural kinds (`SplitGroup`, `UnknownRef`, ...), which belong to the
/// orchestrator layer above.
#[derive(Debug)]
pub enum RewriteEngineError {
  /// `rewrite_chain` or `rebase_onto` was asked to replay zero commits.
  EmptyChain,
  /// A simulated three-way merge produced conflict markers; `at` is the
  /// commit being replayed, `detail` the raw `merge-tree` conflict output.
  /// No ref or working-tree state was touched before this was returned.
  Conflict { at: String, detail: Vec<u8> },
  /// `finalize`'s compare-and-swap lost: the branch moved between the
  /// caller reading its tip and this call.
  RefRaced { reference: String, expected: String, actual: String },
  Store(ObjectStoreError),
}

pub type Result<T> = std::result::Result<T, RewriteEngineError>;

impl fmt::Display for RewriteEngineError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RewriteEngineError::EmptyChain => write!(f, "cannot rewrite an empty commit chain"),
      RewriteEngineError::Conflict { at, detail } => {
        write!(f, "conflict replaying {at}: {}", String::from_utf8_lossy(detail))
      }
      RewriteEngineError::RefRaced { reference, expected, actual } => {
        write!(f, "ref {reference} moved: expected {expected}, found {actual}")
      }
      RewriteEngineError::Store(e) => write!(f, "{e}"),
    }
  }
}

impl std::error::Error for RewriteEngineError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RewriteEngineError::Store(e) => Some(e),
      _ => None,
    }
  }
}

impl From<ObjectStoreError> for RewriteEngineError {
  fn from(err: ObjectStoreError) -> Self {
    match err {
      ObjectStoreError::RefConflict { reference, expected, actual } => RewriteEngineError::RefRaced { reference, expected, actual },
      other => RewriteEngineError::Store(other),
    }
  }
}
