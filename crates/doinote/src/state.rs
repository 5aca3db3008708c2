//! Persisted state: user settings and the duplicate index, in one JSON file.
//!
//! Settings live as flat keys at the top level of the file. The duplicate index lives under the
//! reserved key [`INDEX_KEY`], which settings loading and saving never touch, so the two
//! concerns cannot overwrite each other.
//!
//! ```json
//! {
//!   "folder": "Papers",
//!   "confirmDuplicates": true,
//!   "__duplicateIndex": { "byDoi": {}, "byTitle": {}, "meta": { "schemaVersion": 1, "lastBuilt": null } }
//! }
//! ```

use serde_json::{Map, Value};

use super::*;
use crate::index::IndexData;

/// Top-level key the duplicate index is stored under.
pub const INDEX_KEY: &str = "__duplicateIndex";

/// Handle on the JSON state file.
#[derive(Debug, Clone)]
pub struct StateStore {
  /// Location of the state file
  path: PathBuf,
}

impl StateStore {
  /// Uses the state file at `path`. Nothing is read or created until first use.
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  /// Uses the default state file of a vault, `<vault>/.doinote/state.json`.
  pub fn for_vault(vault: &vault::LocalVault) -> Self { Self::new(Self::default_path(vault.root())) }

  /// Default state file location for a vault root.
  pub fn default_path(vault_root: &Path) -> PathBuf {
    vault_root.join(".doinote").join("state.json")
  }

  /// Location of the state file.
  pub fn path(&self) -> &Path { &self.path }

  /// Loads settings, merged over the defaults.
  pub fn load_settings(&self) -> Result<Settings, DoinoteError> {
    let mut blob = self.read_blob()?;
    blob.remove(INDEX_KEY);
    Ok(serde_json::from_value(Value::Object(blob))?)
  }

  /// Saves settings, leaving the persisted index untouched.
  pub fn save_settings(&self, settings: &Settings) -> Result<(), DoinoteError> {
    let existing = self.read_blob()?;
    let mut blob = match serde_json::to_value(settings)? {
      Value::Object(map) => map,
      _ => Map::new(),
    };
    blob.remove(INDEX_KEY);
    if let Some(index) = existing.get(INDEX_KEY) {
      blob.insert(INDEX_KEY.to_string(), index.clone());
    }
    self.write_blob(&blob)
  }

  /// Loads the persisted index, if one was ever saved.
  pub fn load_index(&self) -> Result<Option<IndexData>, DoinoteError> {
    match self.read_blob()?.remove(INDEX_KEY) {
      Some(value) => Ok(Some(serde_json::from_value(value)?)),
      None => Ok(None),
    }
  }

  /// Saves the index under [`INDEX_KEY`], leaving settings untouched.
  pub fn save_index(&self, index: &IndexData) -> Result<(), DoinoteError> {
    let mut blob = self.read_blob()?;
    blob.insert(INDEX_KEY.to_string(), serde_json::to_value(index)?);
    self.write_blob(&blob)
  }

  /// Reads the whole file; a missing file is an empty object.
  fn read_blob(&self) -> Result<Map<String, Value>, DoinoteError> {
    if !self.path.exists() {
      trace!("No state file at {}, using defaults", self.path.display());
      return Ok(Map::new());
    }
    let text = std::fs::read_to_string(&self.path)?;
    if text.trim().is_empty() {
      return Ok(Map::new());
    }
    match serde_json::from_str(&text)? {
      Value::Object(map) => Ok(map),
      other => {
        warn!("Ignoring state file {} with non-object content: {other}", self.path.display());
        Ok(Map::new())
      },
    }
  }

  /// Replaces the whole file.
  fn write_blob(&self, blob: &Map<String, Value>) -> Result<(), DoinoteError> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(blob)?;
    std::fs::write(&self.path, text)?;
    debug!("Persisted state to {}", self.path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn test_missing_file_gives_defaults() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = StateStore::new(dir.path().join("nested").join("state.json"));
    assert_eq!(store.load_settings()?, Settings::default());
    assert!(store.load_index()?.is_none());
    Ok(())
  }

  #[test]
  fn test_settings_and_index_do_not_collide() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = StateStore::new(dir.path().join("state.json"));

    let mut index = IndexData::default();
    index.by_doi.insert("10.1/a".into(), "Papers/A.md".into());
    store.save_index(&index)?;

    let settings = Settings { folder: "Refs".into(), ..Default::default() };
    store.save_settings(&settings)?;

    assert_eq!(store.load_index()?.unwrap(), index);
    assert_eq!(store.load_settings()?, settings);

    store.save_index(&IndexData::default())?;
    assert_eq!(store.load_settings()?.folder, "Refs");

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(store.path())?)?;
    assert_eq!(raw["folder"], "Refs");
    assert!(raw[INDEX_KEY]["byDoi"].is_object());
    assert!(raw[INDEX_KEY]["meta"]["schemaVersion"].is_number());
    Ok(())
  }
}
