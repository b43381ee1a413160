use crate::commit::CommitRecord;
use crate::error::{Result, StackError};
use git_executor::git_command_executor::GitCommandExecutor;
use trailers::TrailerCodec;
use tracing::instrument;

const UNIT_SEP: char = '\x1e';
const FIELD_SEP: char = '\x1f';

/// Reads every commit between the merge base with `integration_branch` and
/// `HEAD`, oldest first, in a single batched `git log` call (hash and full
/// body separated by `\x1f`, records separated by `\x1e`), then attaches
/// parsed trailers to each.
#[instrument(skip(git, trailer_codec))]
pub fn read_stack(git: &GitCommandExecutor, repo_path: &str, integration_branch: &str, trailer_codec: &TrailerCodec) -> Result<Vec<CommitRecord>> {
  if git.execute_command(&["rev-parse", "--verify", "--quiet", integration_branch], repo_path).is_err() {
    return Err(StackError::NoIntegrationBranch { branch: integration_branch.to_string() });
  }

  let fork_point = git
    .execute_command(&["merge-base", "HEAD", integration_branch], repo_path)
    .map_err(|e| StackError::Io(e))?
    .trim()
    .to_string();

  let range = format!("{fork_point}..HEAD");
  let format = format!("--pretty=format:%H{FIELD_SEP}%B{UNIT_SEP}");
  let raw = git.execute_command_raw(&["log", "--reverse", "--no-merges", &format, &range], repo_path).map_err(StackError::Io)?;

  let mut commits = Vec::new();
  for record in raw.split(UNIT_SEP) {
    let record = record.trim_start_matches('\n');
    if record.trim().is_empty() {
      continue;
    }
    let mut fields = record.splitn(2, FIELD_SEP);
    let hash = fields.next().unwrap_or("").trim().to_string();
    let body = fields.next().unwrap_or("").trim_end_matches(['\n', '\r']).to_string();
    let subject = body.lines().next().unwrap_or("").to_string();
    let trailers = trailer_codec.parse(&body)?;
    commits.push(CommitRecord { hash, subject, body, trailers });
  }
  Ok(commits)
}
