//! Placing rendered notes in the vault.

use super::*;
use crate::{render::RenderedNote, vault::join_path};

/// Extension every note is written with.
pub const NOTE_EXTENSION: &str = "md";

/// Writes notes into one folder of a vault without overwriting anything.
pub struct NoteWriter<'a> {
  /// Where notes go
  vault:  &'a dyn FileStore,
  /// Normalized vault-relative folder
  folder: String,
}

impl<'a> NoteWriter<'a> {
  /// Creates a writer for `folder` (vault-relative, `""` for the vault root).
  pub fn new(vault: &'a dyn FileStore, folder: &str) -> Self {
    Self { vault, folder: vault::normalize_path(folder) }
  }

  /// Makes sure the folder exists, creating it if needed.
  ///
  /// # Errors
  ///
  /// Returns [`DoinoteError::PathConflict`] if a file occupies the folder's path.
  pub fn ensure_folder(&self) -> Result<(), DoinoteError> {
    if self.folder.is_empty() {
      return Ok(());
    }
    match self.vault.entry_kind(&self.folder) {
      Some(EntryKind::Folder) => Ok(()),
      Some(EntryKind::File) => Err(DoinoteError::PathConflict { path: self.folder.clone() }),
      None => {
        info!("Creating note folder {}", self.folder);
        self.vault.create_folder(&self.folder)
      },
    }
  }

  /// The first free path for `filename`: `name.md`, then `name (1).md`, `name (2).md`, ...
  pub fn available_path(&self, filename: &str) -> String {
    let candidate = |suffix: Option<usize>| {
      let name = match suffix {
        Some(n) => format!("{filename} ({n}).{NOTE_EXTENSION}"),
        None => format!("{filename}.{NOTE_EXTENSION}"),
      };
      join_path(&self.folder, &name)
    };

    let mut path = candidate(None);
    let mut n = 0;
    while self.vault.entry_kind(&path).is_some() {
      n += 1;
      path = candidate(Some(n));
    }
    path
  }

  /// Writes a rendered note and returns its vault path.
  pub fn write(&self, note: &RenderedNote) -> Result<String, DoinoteError> {
    self.ensure_folder()?;
    let path = self.available_path(&note.filename);
    self.vault.create_file(&path, &note.content())?;
    info!("Wrote note {path}");
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;
  use crate::vault::LocalVault;

  fn note(filename: &str) -> RenderedNote {
    RenderedNote {
      filename:    filename.to_string(),
      frontmatter: format!("---\ntitle: \"{filename}\"\n---"),
      body:        String::new(),
    }
  }

  #[test]
  fn test_collisions_get_numbered() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let vault = LocalVault::new(dir.path());
    let writer = NoteWriter::new(&vault, "Papers");

    assert_eq!(writer.write(&note("X"))?, "Papers/X.md");
    assert_eq!(writer.write(&note("X"))?, "Papers/X (1).md");
    assert_eq!(writer.write(&note("X"))?, "Papers/X (2).md");
    assert_eq!(writer.write(&note("Y"))?, "Papers/Y.md");
    assert_eq!(vault.list_files()?.len(), 4);
    Ok(())
  }

  #[test]
  fn test_content_and_nested_folder() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let vault = LocalVault::new(dir.path());
    let writer = NoteWriter::new(&vault, "/Library/Papers/");

    let mut rendered = note("Example Paper");
    rendered.body = "Body text".into();
    let path = writer.write(&rendered)?;

    assert_eq!(path, "Library/Papers/Example Paper.md");
    assert_eq!(vault.read_to_string(&path)?, "---\ntitle: \"Example Paper\"\n---\n\nBody text");
    Ok(())
  }

  #[test]
  fn test_vault_root_folder() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let vault = LocalVault::new(dir.path());
    assert_eq!(NoteWriter::new(&vault, "").write(&note("Root"))?, "Root.md");
    Ok(())
  }

  #[test]
  fn test_folder_path_taken_by_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let vault = LocalVault::new(dir.path());
    vault.create_file("Papers", "not a folder")?;

    let err = NoteWriter::new(&vault, "Papers").write(&note("X")).unwrap_err();
    assert!(matches!(err, DoinoteError::PathConflict { ref path } if path == "Papers"));
    Ok(())
  }
}
