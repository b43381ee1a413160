use crate::error::{ObjectStoreError, Result};
use crate::identity::Identity;
use git_executor::git_command_executor::GitCommandExecutor;
use git_executor::git_info::GitInfo;
use tracing::{debug, instrument};

/// Minimum (major, minor) git needs to support `merge-tree --write-tree
/// --merge-base`, the precondition for the plumbing rebase (component G).
pub const MIN_GIT_FOR_MERGE_TREE: (u32, u32) = (2, 38);

const FIELD_SEP: &str = "\x1f";

/// Result of a simulated three-way tree merge. Never touches the working tree
/// or index — see `ObjectStore::merge_tree`.
#[derive(Debug, Clone)]
pub enum MergeOutcome {
  Clean(String),
  Conflict(Vec<u8>),
}

/// Thin wrapper over `GitCommandExecutor` implementing the tree/commit/ref
/// primitives the rest of the engine is built on. Every method here is a single
/// git invocation; no method reads or writes the working tree except
/// `materialize`.
#[derive(Clone)]
pub struct ObjectStore {
  git: GitCommandExecutor,
  repo_path: String,
}

impl ObjectStore {
  pub fn new(git: GitCommandExecutor, repo_path: impl Into<String>) -> Self {
    Self { git, repo_path: repo_path.into() }
  }

  pub fn repo_path(&self) -> &str {
    &self.repo_path
  }

  /// Refuse to proceed when the discovered git lacks the merge-tree semantics
  /// component G depends on.
  #[instrument(skip(self))]
  pub fn version_check(&self, min: (u32, u32)) -> Result<()> {
    let info: GitInfo = self.git.get_info()?;
    let meets = info.meets_minimum(min.0, min.1).map_err(|e| ObjectStoreError::Io(anyhow::anyhow!(e)))?;
    if meets {
      Ok(())
    } else {
      Err(ObjectStoreError::ToolTooOld { found: info.version, required: min })
    }
  }

  #[instrument(skip(self))]
  pub fn get_tree(&self, commit_ref: &str) -> Result<String> {
    let spec = format!("{commit_ref}^{{tree}}");
    self.rev_parse(&spec, commit_ref)
  }

  #[instrument(skip(self))]
  pub fn get_parents(&self, commit_ref: &str) -> Result<Vec<String>> {
    let output = self
      .git
      .execute_command(&["rev-list", "--parents", "-n", "1", commit_ref], &self.repo_path)
      .map_err(|e| self.missing_or_io(commit_ref, e))?;
    let mut parts = output.split_whitespace();
    parts.next(); // the commit itself
    Ok(parts.map(str::to_string).collect())
  }

  /// Full message, trailing blank lines trimmed, internal formatting preserved.
  #[instrument(skip(self))]
  pub fn get_message(&self, commit_ref: &str) -> Result<String> {
    let output = self
      .git
      .execute_command_raw(&["log", "-1", "--format=%B", commit_ref], &self.repo_path)
      .map_err(|e| self.missing_or_io(commit_ref, e))?;
    Ok(trim_trailing_newlines(&output))
  }

  #[instrument(skip(self))]
  pub fn get_author_and_committer(&self, commit_ref: &str) -> Result<Identity> {
    let format = format!("--format=%an{FIELD_SEP}%ae{FIELD_SEP}%ad{FIELD_SEP}%cn{FIELD_SEP}%ce{FIELD_SEP}%cd");
    let output = self
      .git
      .execute_command(&["log", "-1", "--date=raw", &format, commit_ref], &self.repo_path)
      .map_err(|e| self.missing_or_io(commit_ref, e))?;
    let mut fields = output.split(FIELD_SEP);
    let mut next = || fields.next().map(str::to_string).unwrap_or_default();
    Ok(Identity {
      author_name: next(),
      author_email: next(),
      author_date: next(),
      committer_name: next(),
      committer_email: next(),
      committer_date: next(),
    })
  }

  /// Create a commit object. Message is piped through stdin (`commit-tree -F
  /// -`) so embedded quotes, backticks, and newlines never cross a shell.
  #[instrument(skip(self, message, identity))]
  pub fn create_commit(&self, tree: &str, parents: &[String], message: &str, identity: &Identity) -> Result<String> {
    let mut args: Vec<&str> = vec!["commit-tree", tree];
    for parent in parents {
      args.push("-p");
      args.push(parent);
    }
    args.push("-F");
    args.push("-");

    let env_vars = identity.env_vars();
    let hash = self
      .git
      .execute_command_with_input_and_env(&args, &self.repo_path, message, &env_vars)
      .map_err(ObjectStoreError::Io)?;
    Ok(hash.trim().to_string())
  }

  /// Simulate a three-way merge of `theirs` onto `ours` using `base` as the
  /// merge base. Never stages anything; purely an object-database operation.
  #[instrument(skip(self))]
  pub fn merge_tree(&self, base: &str, ours: &str, theirs: &str) -> Result<MergeOutcome> {
    let args = vec![
      "-c",
      "merge.conflictStyle=zdiff3",
      "merge-tree",
      "--write-tree",
      "-z",
      "--merge-base",
      base,
      ours,
      theirs,
    ];
    let (output, exit_code) = self.git.execute_command_with_status(&args, &self.repo_path).map_err(ObjectStoreError::Io)?;

    if exit_code == 0 {
      let tree_id = output.split('\0').next().unwrap_or("").trim().to_string();
      Ok(MergeOutcome::Clean(tree_id))
    } else if exit_code == 1 {
      debug!(base, ours, theirs, "merge-tree reported conflicts");
      Ok(MergeOutcome::Conflict(output.into_bytes()))
    } else {
      Err(ObjectStoreError::Io(anyhow::anyhow!("git merge-tree failed (exit {exit_code}): {output}")))
    }
  }

  /// Atomic compare-and-swap on a reference. When `expected_old` is supplied and
  /// the ref has moved, returns `RefConflict` carrying the actual current value
  /// instead of the stale one the caller passed in.
  #[instrument(skip(self))]
  pub fn update_ref(&self, reference: &str, new: &str, expected_old: Option<&str>) -> Result<()> {
    let mut args: Vec<&str> = vec!["update-ref", reference, new];
    if let Some(old) = expected_old {
      args.push(old);
    }
    match self.git.execute_command(&args, &self.repo_path) {
      Ok(_) => Ok(()),
      Err(e) => {
        if expected_old.is_some() {
          let actual = self.rev_parse(reference, reference).unwrap_or_else(|_| "<unresolved>".to_string());
          Err(ObjectStoreError::RefConflict {
            reference: reference.to_string(),
            expected: expected_old.unwrap().to_string(),
            actual,
          })
        } else {
          Err(ObjectStoreError::Io(e))
        }
      }
    }
  }

  /// Forcibly reset the working tree (and index) to match `reference`. The only
  /// method in this crate that touches anything outside the object database.
  #[instrument(skip(self))]
  pub fn materialize(&self, reference: &str) -> Result<()> {
    self.git.execute_command(&["reset", "--hard", reference], &self.repo_path).map_err(ObjectStoreError::Io)?;
    Ok(())
  }

  #[instrument(skip(self))]
  pub fn resolve_short(&self, prefix: &str) -> Result<String> {
    self.rev_parse(prefix, prefix)
  }

  #[instrument(skip(self))]
  pub fn short(&self, hash: &str) -> Result<String> {
    self
      .git
      .execute_command(&["rev-parse", "--short", hash], &self.repo_path)
      .map(|s| s.trim().to_string())
      .map_err(|e| self.missing_or_io(hash, e))
  }

  fn rev_parse(&self, spec: &str, original_ref: &str) -> Result<String> {
    self
      .git
      .execute_command(&["rev-parse", "--verify", spec], &self.repo_path)
      .map(|s| s.trim().to_string())
      .map_err(|e| self.missing_or_io(original_ref, e))
  }

  fn missing_or_io(&self, reference: &str, err: anyhow::Error) -> ObjectStoreError {
    let msg = err.to_string();
    if msg.contains("fatal: ambiguous argument") || msg.contains("unknown revision") || msg.contains("bad revision") || msg.contains("Needed a single revision") {
      ObjectStoreError::ObjectMissing { reference: reference.to_string() }
    } else {
      ObjectStoreError::Io(err)
    }
  }
}

fn trim_trailing_newlines(s: &str) -> String {
  s.trim_end_matches(['\n', '\r']).to_string()
}
