use object_store::ObjectStoreError;
use rewrite_engine::RewriteEngineError;
use stack_model::StackError;
use std::fmt;

/// The orchestrator's error taxonomy. Structural kinds live only here; the
/// Precondition/Conflict/Concurrency/Integrity kinds are propagated from the
/// lower layers (occasionally wrapped with the operation name, per §7).
#[derive(Debug)]
pub enum StackOpsError {
  // --- Precondition ---
  ToolTooOld { found: String, required: (u32, u32) },
  DetachedHead,
  NoIntegrationBranch { branch: String },
  DirtyWorkingTree { files: Vec<String> },

  // --- Structural ---
  SplitGroup { group: String },
  MissingId { commit: String },
  DuplicateId { id: String, first: String, second: String },
  UnknownRef { reference: String },
  NonContiguous { group: String },
  GroupOverlap { commit: String, first_group: String, second_group: String },
  GroupNotFound { group: String },

  // --- Conflict ---
  ReorderConflict { at: String, files: Vec<String> },
  RebaseConflict { at: String, files: Vec<String>, subject: String },
  InProgress { files: Vec<String>, current_commit: String },

  // --- Concurrency ---
  RefRaced { reference: String, expected: String, actual: String },

  // --- Integrity ---
  ObjectMissing { reference: String },
  EmptyChain,

  /// An operation name wrapped around an otherwise-opaque lower-layer
  /// failure, per §7 ("the orchestrator ... may wrap a primitive error with
  /// the operation name").
  Operation { name: &'static str, source: Box<StackOpsError> },

  Io(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StackOpsError>;

impl StackOpsError {
  pub fn wrap(operation: &'static str, err: StackOpsError) -> StackOpsError {
    StackOpsError::Operation { name: operation, source: Box::new(err) }
  }
}

impl fmt::Display for StackOpsError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StackOpsError::ToolTooOld { found, required } => {
        write!(f, "git {found} does not support the required merge-tree semantics (need >= {}.{})", required.0, required.1)
      }
      StackOpsError::DetachedHead => write!(f, "HEAD is detached; stack operations require a named branch"),
      StackOpsError::NoIntegrationBranch { branch } => write!(f, "integration branch {branch} does not resolve"),
      StackOpsError::DirtyWorkingTree { files } => write!(f, "working tree has uncommitted changes: {}", files.join(", ")),
      StackOpsError::SplitGroup { group } => write!(f, "group {group} is split across non-adjacent commits"),
      StackOpsError::MissingId { commit } => write!(f, "commit {commit} has no Commit-Id trailer"),
      StackOpsError::DuplicateId { id, first, second } => write!(f, "id {id} is carried by both {first} and {second}"),
      StackOpsError::UnknownRef { reference } => write!(f, "unknown commit reference: {reference}"),
      StackOpsError::NonContiguous { group } => write!(f, "group {group}'s commits would not be contiguous in the resulting order"),
      StackOpsError::GroupOverlap { commit, first_group, second_group } => {
        write!(f, "commit {commit} was assigned to both group {first_group} and group {second_group}")
      }
      StackOpsError::GroupNotFound { group } => write!(f, "no group {group} in the current stack"),
      StackOpsError::ReorderConflict { at, files } => write!(f, "reorder conflict replaying {at}: {}", files.join(", ")),
      StackOpsError::RebaseConflict { at, files, subject } => {
        write!(f, "rebase conflict replaying {at} ({subject}): {}", files.join(", "))
      }
      StackOpsError::InProgress { current_commit, files } => {
        write!(f, "a rebase is already in progress at {current_commit}: {}", files.join(", "))
      }
      StackOpsError::RefRaced { reference, expected, actual } => {
        write!(f, "ref {reference} moved: expected {expected}, found {actual}")
      }
      StackOpsError::ObjectMissing { reference } => write!(f, "object not found: {reference}"),
      StackOpsError::EmptyChain => write!(f, "cannot rewrite an empty commit chain"),
      StackOpsError::Operation { name, source } => write!(f, "{name}: {source}"),
      StackOpsError::Io(e) => write!(f, "{e}"),
    }
  }
}

impl std::error::Error for StackOpsError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      StackOpsError::Operation { source, .. } => Some(source),
      _ => None,
    }
  }
}

impl From<anyhow::Error> for StackOpsError {
  fn from(err: anyhow::Error) -> Self {
    StackOpsError::Io(err)
  }
}

impl From<ObjectStoreError> for StackOpsError {
  fn from(err: ObjectStoreError) -> Self {
    match err {
      ObjectStoreError::ToolTooOld { found, required } => StackOpsError::ToolTooOld { found, required },
      ObjectStoreError::RefConflict { reference, expected, actual } => StackOpsError::RefRaced { reference, expected, actual },
      ObjectStoreError::ObjectMissing { reference } => StackOpsError::ObjectMissing { reference },
      ObjectStoreError::Io(e) => StackOpsError::Io(e),
    }
  }
}

impl From<StackError> for StackOpsError {
  fn from(err: StackError) -> Self {
    match err {
      StackError::NoIntegrationBranch { branch } => StackOpsError::NoIntegrationBranch { branch },
      StackError::SplitGroup { group } => StackOpsError::SplitGroup { group },
      StackError::MissingId { commit } => StackOpsError::MissingId { commit },
      StackError::DuplicateId { id, first, second } => StackOpsError::DuplicateId { id, first, second },
      StackError::Io(e) => StackOpsError::Io(e),
    }
  }
}

impl From<RewriteEngineError> for StackOpsError {
  fn from(err: RewriteEngineError) -> Self {
    match err {
      RewriteEngineError::EmptyChain => StackOpsError::EmptyChain,
      RewriteEngineError::Conflict { at, detail } => StackOpsError::ReorderConflict { at, files: conflict_files(&detail) },
      RewriteEngineError::RefRaced { reference, expected, actual } => StackOpsError::RefRaced { reference, expected, actual },
      RewriteEngineError::Store(e) => StackOpsError::from(e),
    }
  }
}

impl From<trailers::TrailersError> for StackOpsError {
  fn from(err: trailers::TrailersError) -> Self {
    match err {
      trailers::TrailersError::Io(e) => StackOpsError::Io(e),
    }
  }
}

impl From<sideband::SideBandError> for StackOpsError {
  fn from(err: sideband::SideBandError) -> Self {
    match err {
      sideband::SideBandError::Io(e) => StackOpsError::Io(e),
    }
  }
}

/// `merge-tree -z` conflict output is NUL-separated `<mode> <oid> <stage>\t<path>`
/// entries after the tree line; extract just the paths for the user-facing
/// conflict list, sanitized of everything else (no raw diagnostic bytes
/// surface past this boundary, per §7).
pub(crate) fn conflict_files(detail: &[u8]) -> Vec<String> {
  let text = String::from_utf8_lossy(detail);
  let mut files: Vec<String> = Vec::new();
  for part in text.split(['\0', '\u{0}']) {
    if let Some(tab) = part.find('\t') {
      let path = part[tab + 1..].trim();
      if !path.is_empty() && !files.contains(&path.to_string()) {
        files.push(path.to_string());
      }
    }
  }
  files
}
