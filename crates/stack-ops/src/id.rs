use rand::Rng;
use std::collections::HashSet;

/// 8 lowercase hex characters from a cryptographically adequate source.
/// Regenerates on collision against `existing`; uniqueness is only
/// maintained within a single stack, never across all of history.
pub fn generate_id(existing: &HashSet<String>) -> String {
  loop {
    let candidate = format!("{:08x}", rand::rng().random::<u32>());
    if !existing.contains(&candidate) {
      return candidate;
    }
  }
}
