//! The note store: where notes live and how they are read back.
//!
//! All paths handed across the [`FileStore`] trait are vault-relative, use `/` as separator and
//! carry no leading or trailing slash (see [`normalize_path`]). [`LocalVault`] implements the
//! trait on top of a directory on disk.

use std::{fs::OpenOptions, io::Write};

use serde_yaml::Value as YamlValue;

use super::*;

/// Scalar frontmatter values of a note, keyed by field name.
pub type Frontmatter = BTreeMap<String, String>;

/// What a vault path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
  /// A regular file
  File,
  /// A folder
  Folder,
}

/// Access to the notes of a vault.
///
/// Implementations must treat every `path` argument as vault-relative.
pub trait FileStore: Send + Sync {
  /// Every Markdown note in the vault, sorted by path.
  fn list_files(&self) -> Result<Vec<String>, DoinoteError>;

  /// What `path` points at, or `None` if nothing is there.
  fn entry_kind(&self, path: &str) -> Option<EntryKind>;

  /// Reads a file as UTF-8 text.
  fn read_to_string(&self, path: &str) -> Result<String, std::io::Error>;

  /// Creates a new file with `content`. Fails if the file already exists.
  fn create_file(&self, path: &str, content: &str) -> Result<(), DoinoteError>;

  /// Creates a folder and any missing parents.
  fn create_folder(&self, path: &str) -> Result<(), DoinoteError>;

  /// The scalar frontmatter fields of a note, or `None` if it has no readable frontmatter.
  fn frontmatter(&self, path: &str) -> Option<Frontmatter> {
    let content = self.read_to_string(path).ok()?;
    parse_frontmatter(&content)
  }
}

/// Normalizes a vault-relative path: `\` becomes `/`, empty segments and `.` segments are
/// dropped, and leading or trailing slashes are removed.
pub fn normalize_path(path: &str) -> String {
  path
    .replace('\\', "/")
    .split('/')
    .filter(|segment| !segment.is_empty() && *segment != ".")
    .collect::<Vec<_>>()
    .join("/")
}

/// Joins a folder and a file name into a vault path.
pub fn join_path(folder: &str, name: &str) -> String {
  let folder = normalize_path(folder);
  if folder.is_empty() {
    normalize_path(name)
  } else {
    format!("{folder}/{}", normalize_path(name))
  }
}

/// Whether `path` lies inside `folder` (an empty folder is the vault root).
pub fn is_under(path: &str, folder: &str) -> bool {
  let path = normalize_path(path);
  let folder = normalize_path(folder);
  folder.is_empty() || path == folder || path.starts_with(&format!("{folder}/"))
}

/// The file name of a path without its extension.
pub fn file_stem(path: &str) -> String {
  let name = path.rsplit('/').next().unwrap_or(path);
  match name.rsplit_once('.') {
    Some((stem, _)) if !stem.is_empty() => stem.to_string(),
    _ => name.to_string(),
  }
}

/// Whether a path names a Markdown note.
pub fn is_markdown(path: &str) -> bool { path.to_lowercase().ends_with(".md") }

/// Extracts the scalar fields of a leading `---` YAML block.
///
/// Lists and nested mappings are skipped; strings, numbers and booleans are kept in their
/// textual form.
pub fn parse_frontmatter(content: &str) -> Option<Frontmatter> {
  let content = content.strip_prefix('\u{feff}').unwrap_or(content);
  let rest = content.strip_prefix("---")?;
  let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
  let yaml = if rest.starts_with("---") {
    ""
  } else {
    let end = rest.find("\n---")?;
    &rest[..end]
  };
  if yaml.trim().is_empty() {
    return Some(Frontmatter::new());
  }

  let mapping = match serde_yaml::from_str::<YamlValue>(yaml) {
    Ok(YamlValue::Mapping(mapping)) => mapping,
    Ok(YamlValue::Null) => return Some(Frontmatter::new()),
    Ok(_) => return None,
    Err(e) => {
      debug!("Unreadable frontmatter: {e}");
      return None;
    },
  };

  let fields = mapping
    .into_iter()
    .filter_map(|(key, value)| {
      let key = key.as_str()?.to_string();
      let value = match value {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        _ => return None,
      };
      Some((key, value))
    })
    .collect();
  Some(fields)
}

/// A vault backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalVault {
  /// Directory all vault paths are relative to
  root: PathBuf,
}

impl LocalVault {
  /// Opens the vault rooted at `root`. The directory does not need to exist yet.
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  /// Default vault location in the user's documents directory.
  pub fn default_root() -> PathBuf {
    dirs::document_dir().unwrap_or_else(|| PathBuf::from(".")).join("doinote")
  }

  /// The vault's root directory.
  pub fn root(&self) -> &Path { &self.root }

  /// Absolute location of a vault path.
  pub fn absolute(&self, path: &str) -> PathBuf {
    normalize_path(path).split('/').filter(|s| !s.is_empty()).fold(self.root.clone(), |p, s| p.join(s))
  }

  /// Vault path of an absolute location, if it lies inside the vault.
  pub fn relative(&self, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(&self.root).ok()?;
    let relative = normalize_path(&relative.to_string_lossy());
    (!relative.is_empty()).then_some(relative)
  }
}

impl FileStore for LocalVault {
  fn list_files(&self) -> Result<Vec<String>, DoinoteError> {
    if !self.root.is_dir() {
      return Ok(Vec::new());
    }
    let pattern = format!("{}/**/*.md", glob::Pattern::escape(&self.root.to_string_lossy()));
    let mut files: Vec<String> = glob::glob(&pattern)?
      .filter_map(|entry| match entry {
        Ok(path) => Some(path),
        Err(e) => {
          warn!("Skipping unreadable vault entry: {e}");
          None
        },
      })
      .filter(|path| path.is_file())
      .filter_map(|path| self.relative(&path))
      .collect();
    files.sort();
    trace!("Listed {} notes under {}", files.len(), self.root.display());
    Ok(files)
  }

  fn entry_kind(&self, path: &str) -> Option<EntryKind> {
    let metadata = std::fs::metadata(self.absolute(path)).ok()?;
    if metadata.is_dir() {
      Some(EntryKind::Folder)
    } else {
      Some(EntryKind::File)
    }
  }

  fn read_to_string(&self, path: &str) -> Result<String, std::io::Error> {
    std::fs::read_to_string(self.absolute(path))
  }

  fn create_file(&self, path: &str, content: &str) -> Result<(), DoinoteError> {
    let target = self.absolute(path);
    let write_error = |source| DoinoteError::Write { path: normalize_path(path), source };
    let mut file = OpenOptions::new().write(true).create_new(true).open(&target).map_err(write_error)?;
    file.write_all(content.as_bytes()).map_err(write_error)?;
    debug!("Created {}", target.display());
    Ok(())
  }

  fn create_folder(&self, path: &str) -> Result<(), DoinoteError> {
    std::fs::create_dir_all(self.absolute(path))
      .map_err(|source| DoinoteError::Write { path: normalize_path(path), source })
  }
}
