use crate::error::{Result, SideBandError};
use git_executor::git_command_executor::GitCommandExecutor;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{instrument, warn};

/// The document living behind the side-band ref. Three flat namespaces: group
/// titles, per-unit stack settings, and content hashes used to detect
/// no-op rewrites. Every key is a unit id (8 hex chars).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
  #[serde(default)]
  pub groups: IndexMap<String, String>,
  #[serde(default)]
  pub stacks: IndexMap<String, String>,
  #[serde(default, rename = "contentHashes")]
  pub content_hashes: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
  Groups,
  Stacks,
  ContentHashes,
}

/// What `purge` dropped, broken down by namespace, so a caller can decide
/// whether any of it is worth surfacing to a user (e.g. stale stack configs
/// for a branch that no longer exists).
#[derive(Debug, Clone, Default)]
pub struct PurgeReport {
  pub stale_groups: Vec<String>,
  pub stale_stacks: Vec<String>,
  pub stale_hashes: Vec<String>,
}

/// A dedicated ref holding the document as a single JSON blob, written via
/// `hash-object -w --stdin` + `update-ref` and read back with `cat-file -p`.
/// Generalizes the git-notes-as-auxiliary-ref pattern into one global
/// document instead of one note per commit.
#[derive(Clone)]
pub struct SideBand {
  git: GitCommandExecutor,
  repo_path: String,
  reference: String,
}

impl SideBand {
  pub fn new(git: GitCommandExecutor, repo_path: impl Into<String>, reference: impl Into<String>) -> Self {
    Self { git, repo_path: repo_path.into(), reference: reference.into() }
  }

  /// Reads the document. A missing ref, or a ref pointing at content that
  /// doesn't parse as the expected JSON shape, is treated as an empty
  /// document rather than an error.
  #[instrument(skip(self))]
  pub fn read(&self) -> Result<Document> {
    match self.git.execute_command(&["cat-file", "-p", &self.reference], &self.repo_path) {
      Ok(text) => Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!(error = %e, reference = %self.reference, "side-band content did not parse, treating as empty");
        Document::default()
      })),
      Err(_) => Ok(Document::default()),
    }
  }

  #[instrument(skip(self, document))]
  pub fn write(&self, document: &Document) -> Result<()> {
    let json = serde_json::to_string_pretty(document).map_err(|e| SideBandError::Io(anyhow::anyhow!(e)))?;
    let blob = self.git.execute_command_with_input(&["hash-object", "-w", "--stdin"], &self.repo_path, &json).map_err(SideBandError::Io)?;
    self.git.execute_command(&["update-ref", &self.reference, blob.trim()], &self.repo_path).map_err(SideBandError::Io)?;
    Ok(())
  }

  pub fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>> {
    let document = self.read()?;
    Ok(namespace_ref(&document, namespace).get(key).cloned())
  }

  pub fn set(&self, namespace: Namespace, key: &str, value: impl Into<String>) -> Result<()> {
    let mut document = self.read()?;
    namespace_mut(&mut document, namespace).insert(key.to_string(), value.into());
    self.write(&document)
  }

  pub fn delete(&self, namespace: Namespace, key: &str) -> Result<()> {
    self.delete_many(namespace, std::slice::from_ref(&key.to_string()))
  }

  pub fn delete_many(&self, namespace: Namespace, keys: &[String]) -> Result<()> {
    let mut document = self.read()?;
    let map = namespace_mut(&mut document, namespace);
    for key in keys {
      map.shift_remove(key);
    }
    self.write(&document)
  }

  /// Drops every entry across all three namespaces whose key is not in
  /// `alive_unit_ids`, then reports what was dropped.
  #[instrument(skip(self, alive_unit_ids))]
  pub fn purge(&self, alive_unit_ids: &HashSet<String>) -> Result<PurgeReport> {
    let mut document = self.read()?;
    let stale_groups = drop_stale(&mut document.groups, alive_unit_ids);
    let stale_stacks = drop_stale(&mut document.stacks, alive_unit_ids);
    let stale_hashes = drop_stale(&mut document.content_hashes, alive_unit_ids);
    self.write(&document)?;
    Ok(PurgeReport { stale_groups, stale_stacks, stale_hashes })
  }
}

fn drop_stale(map: &mut IndexMap<String, String>, alive: &HashSet<String>) -> Vec<String> {
  let stale: Vec<String> = map.keys().filter(|key| !alive.contains(key.as_str())).cloned().collect();
  for key in &stale {
    map.shift_remove(key);
  }
  stale
}

fn namespace_ref(document: &Document, namespace: Namespace) -> &IndexMap<String, String> {
  match namespace {
    Namespace::Groups => &document.groups,
    Namespace::Stacks => &document.stacks,
    Namespace::ContentHashes => &document.content_hashes,
  }
}

fn namespace_mut(document: &mut Document, namespace: Namespace) -> &mut IndexMap<String, String> {
  match namespace {
    Namespace::Groups => &mut document.groups,
    Namespace::Stacks => &mut document.stacks,
    Namespace::ContentHashes => &mut document.content_hashes,
  }
}
