use crate::error::{Result, TrailersError};
use git_executor::git_command_executor::GitCommandExecutor;
use indexmap::IndexMap;
use tracing::instrument;

/// Thin wrapper over `git interpret-trailers`. `parse` always shells out, so
/// "what counts as a trailer block" stays bit-for-bit identical to whatever
/// the commit will be checked out and read back with by any other git tool.
/// `add`/`replace`/`strip_prefix` are pure string transforms over the commit
/// body.
#[derive(Clone)]
pub struct TrailerCodec {
  git: GitCommandExecutor,
  repo_path: String,
}

impl TrailerCodec {
  pub fn new(git: GitCommandExecutor, repo_path: impl Into<String>) -> Self {
    Self { git, repo_path: repo_path.into() }
  }

  /// Parses the trailer block at the end of `body`, last-value-wins per key.
  /// An empty body (or one with no trailer block) yields an empty map.
  #[instrument(skip(self, body))]
  pub fn parse(&self, body: &str) -> Result<IndexMap<String, String>> {
    if body.trim().is_empty() {
      return Ok(IndexMap::new());
    }
    let output = self.git.execute_command_with_input(&["interpret-trailers", "--parse"], &self.repo_path, body).map_err(TrailersError::Io)?;
    Ok(parse_trailer_lines(&output))
  }

  /// Appends each `(key, value)` pair as a trailer, always adding a new line
  /// even if the key already appears (last value wins on the next `parse`).
  #[instrument(skip(self, body, trailers))]
  pub fn add(&self, body: &str, trailers: &[(&str, &str)]) -> Result<String> {
    self.apply(body, trailers, "--if-exists=add")
  }

  /// Like `add`, but overwrites every existing trailer with a matching key
  /// instead of appending a duplicate.
  #[instrument(skip(self, body, trailers))]
  pub fn replace(&self, body: &str, trailers: &[(&str, &str)]) -> Result<String> {
    self.apply(body, trailers, "--if-exists=replace")
  }

  fn apply(&self, body: &str, trailers: &[(&str, &str)], if_exists: &str) -> Result<String> {
    if trailers.is_empty() {
      return Ok(body.to_string());
    }
    let mut args: Vec<String> = vec!["interpret-trailers".to_string(), if_exists.to_string(), "--no-divider".to_string()];
    for (key, value) in trailers {
      args.push(format!("--trailer={key}={value}"));
    }
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = self.git.execute_command_with_input(&arg_refs, &self.repo_path, body).map_err(TrailersError::Io)?;
    Ok(trim_trailing_newlines(&output))
  }

  /// Removes every trailer line whose key starts with `prefix` (case
  /// sensitive), e.g. stripping both `Group:` and `Group-Title:` with a
  /// single `strip_prefix(body, "Group")` call. Leaves the rest of the
  /// message untouched; collapses a now-empty trailer block entirely.
  pub fn strip_prefix(&self, body: &str, prefix: &str) -> Result<String> {
    let Some((block_start, block_end)) = trailer_block_bounds(body) else {
      return Ok(body.to_string());
    };
    let head = &body[..block_start];
    let block = &body[block_start..block_end];
    let tail = &body[block_end..];

    let kept: Vec<&str> = block
      .lines()
      .filter(|line| {
        let key = line.split(':').next().unwrap_or("");
        !key.starts_with(prefix)
      })
      .collect();

    let rebuilt = if kept.is_empty() {
      trim_trailing_newlines(head.trim_end_matches('\n'))
    } else {
      format!("{}{}\n{}", head, kept.join("\n"), tail)
    };
    Ok(trim_trailing_newlines(&rebuilt))
  }
}

/// Every line of `--parse` output is `key: value`, last occurrence wins.
fn parse_trailer_lines(output: &str) -> IndexMap<String, String> {
  let mut map = IndexMap::new();
  for line in output.lines() {
    let Some((key, value)) = line.split_once(':') else { continue };
    map.insert(key.trim().to_string(), value.trim().to_string());
  }
  map
}

/// Finds the trailing paragraph of `Key: Value` lines, mirroring the
/// heuristic git itself uses when no `---`/blank-divider is present: the
/// last paragraph, every non-blank line matching the trailer shape.
fn trailer_block_bounds(body: &str) -> Option<(usize, usize)> {
  let trimmed_end = body.trim_end_matches(['\n', '\r']).len();
  let text = &body[..trimmed_end];

  let last_blank = text.rfind("\n\n").map(|idx| idx + 2).unwrap_or(0);
  let candidate = &text[last_blank..];
  if candidate.trim().is_empty() {
    return None;
  }

  let is_trailer_line = |line: &str| {
    let line = line.trim();
    !line.is_empty() && line.split_once(':').map(|(k, _)| !k.is_empty() && !k.contains(' ')).unwrap_or(false)
  };
  if candidate.lines().all(is_trailer_line) {
    Some((last_blank, trimmed_end))
  } else {
    None
  }
}

fn trim_trailing_newlines(s: &str) -> String {
  s.trim_end_matches(['\n', '\r']).to_string()
}
