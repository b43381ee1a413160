use crate::error::Result;
use object_store::ObjectStore;
use tracing::instrument;

/// What `finalize` actually did to the working tree, so callers (and tests)
/// can assert the short-circuit fired when expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeOutcome {
  pub materialized: bool,
}

/// Lands a rewritten chain: compare-and-swaps `refs/heads/<branch>` from
/// `expected_old_tip` to `new_tip`, then resets the working tree only if the
/// tip's tree content actually changed. This short-circuit is load-bearing:
/// message-only rewrites leave file content untouched, so resetting
/// unconditionally would needlessly disturb untracked files.
#[instrument(skip(store))]
pub fn finalize(store: &ObjectStore, branch: &str, expected_old_tip: &str, new_tip: &str) -> Result<FinalizeOutcome> {
  let old_tree = store.get_tree(expected_old_tip)?;
  let new_tree = store.get_tree(new_tip)?;

  let reference = format!("refs/heads/{branch}");
  store.update_ref(&reference, new_tip, Some(expected_old_tip))?;

  if old_tree != new_tree {
    store.materialize(&reference)?;
    Ok(FinalizeOutcome { materialized: true })
  } else {
    Ok(FinalizeOutcome { materialized: false })
  }
}
