//! The duplicate index: normalized DOI and title → note path.
//!
//! The index is a cache. The truth lives in each note's frontmatter, and the index can always be
//! rebuilt from it by [`DuplicateIndex::rebuild`]. Between rebuilds it is patched one file at a
//! time as notes are created, renamed and deleted, and it is written back to the
//! [`StateStore`] after every change.
//!
//! # Examples
//!
//! ```no_run
//! use doinote::{
//!   index::{DuplicateIndex, DuplicateQuery},
//!   state::StateStore,
//!   vault::LocalVault,
//! };
//!
//! # fn example() -> Result<(), doinote::errors::DoinoteError> {
//! let vault = LocalVault::new("notes");
//! let index = DuplicateIndex::load(StateStore::for_vault(&vault), &vault, "Papers")?;
//!
//! let query = DuplicateQuery { doi: Some("https://doi.org/10.1/A"), title: None };
//! if let Some(found) = index.find_duplicate(&query) {
//!   println!("already imported as {} (matched by {})", found.path, found.kind);
//! }
//! # Ok(())
//! # }
//! ```

use super::*;
use crate::{
  doi::normalize_doi,
  state::StateStore,
  vault::{file_stem, is_markdown, is_under, normalize_path},
  watch::VaultEvent,
};

/// Version of the persisted index layout. A mismatch forces a rebuild on load.
pub const SCHEMA_VERSION: u32 = 1;

/// The persisted part of the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexData {
  /// Normalized DOI → note path
  pub by_doi:   BTreeMap<String, String>,
  /// Normalized title → note path
  pub by_title: BTreeMap<String, String>,
  /// Bookkeeping about the index itself
  pub meta:     IndexMeta,
}

/// Bookkeeping stored alongside the mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexMeta {
  /// Layout version, see [`SCHEMA_VERSION`]
  pub schema_version: u32,
  /// When the index was last rebuilt from scratch
  pub last_built:     Option<DateTime<Utc>>,
  /// Folder the index was built for
  pub folder:         Option<String>,
}

impl Default for IndexMeta {
  fn default() -> Self { Self { schema_version: SCHEMA_VERSION, last_built: None, folder: None } }
}

impl IndexData {
  /// Whether both mappings are empty.
  pub fn is_empty(&self) -> bool { self.by_doi.is_empty() && self.by_title.is_empty() }
}

/// Which key a duplicate was found by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
  /// Same normalized DOI
  Doi,
  /// Same normalized title
  Title,
}

impl fmt::Display for MatchKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MatchKind::Doi => write!(f, "doi"),
      MatchKind::Title => write!(f, "title"),
    }
  }
}

/// An existing note that matches an incoming paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateMatch {
  /// The key that matched
  pub kind: MatchKind,
  /// Vault path of the existing note
  pub path: String,
}

/// What to look for in [`DuplicateIndex::find_duplicate`]. Either key may be omitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateQuery<'a> {
  /// DOI in any accepted spelling
  pub doi:   Option<&'a str>,
  /// Title as displayed
  pub title: Option<&'a str>,
}

/// Index key for a DOI.
pub fn doi_key(doi: &str) -> String { normalize_doi(doi).to_lowercase() }

/// Index key for a title: lowercased and trimmed, nothing more.
pub fn title_key(title: &str) -> String { title.trim().to_lowercase() }

/// The duplicate index together with where it is persisted.
#[derive(Debug)]
pub struct DuplicateIndex {
  /// The mappings and their bookkeeping
  data:   IndexData,
  /// Normalized vault folder whose notes are indexed
  folder: String,
  /// Where the index is persisted
  store:  StateStore,
}

impl DuplicateIndex {
  /// Creates an empty index for `folder` without reading anything.
  pub fn new(store: StateStore, folder: &str) -> Self {
    Self { data: IndexData::default(), folder: normalize_path(folder), store }
  }

  /// Loads the persisted index, rebuilding it from the vault when it is empty, was written by a
  /// different schema version, or was built for a different folder.
  pub fn load(store: StateStore, vault: &dyn FileStore, folder: &str) -> Result<Self, DoinoteError> {
    let mut index = Self::new(store, folder);
    if let Some(data) = index.store.load_index()? {
      index.data = data;
    }

    let meta = &index.data.meta;
    let stale = meta.schema_version != SCHEMA_VERSION
      || meta.folder.as_deref().is_some_and(|built_for| built_for != index.folder);
    if index.data.is_empty() || stale {
      info!("Duplicate index is empty or stale, rebuilding from {:?}", index.folder);
      index.rebuild(vault)?;
    } else {
      debug!(
        "Loaded duplicate index with {} DOIs and {} titles",
        index.data.by_doi.len(),
        index.data.by_title.len()
      );
    }
    Ok(index)
  }

  /// The current mappings.
  pub fn data(&self) -> &IndexData { &self.data }

  /// The folder whose notes are indexed.
  pub fn folder(&self) -> &str { &self.folder }

  /// Throws everything away and re-derives the index from every note under the folder.
  ///
  /// When two notes share a key, the one enumerated last (by path order) wins.
  pub fn rebuild(&mut self, vault: &dyn FileStore) -> Result<(), DoinoteError> {
    self.data = IndexData::default();
    let folder = self.folder.clone();
    let files = vault.list_files()?;
    let mut indexed = 0;
    for path in files.iter().map(|p| normalize_path(p)).filter(|p| is_under(p, &folder)) {
      self.insert_entries(vault, &path);
      indexed += 1;
    }
    self.data.meta.last_built = Some(Utc::now());
    self.data.meta.folder = Some(self.folder.clone());
    info!(
      "Rebuilt duplicate index from {indexed} notes: {} DOIs, {} titles",
      self.data.by_doi.len(),
      self.data.by_title.len()
    );
    self.persist()
  }

  /// Re-derives the entries of one note, dropping whatever pointed at its path before.
  pub fn update_index_for_file(&mut self, vault: &dyn FileStore, path: &str) -> Result<(), DoinoteError> {
    let path = normalize_path(path);
    self.detach(&path);
    if is_markdown(&path) && is_under(&path, &self.folder) {
      self.insert_entries(vault, &path);
    }
    self.persist()
  }

  /// Drops every entry that points at `path`, or at anything below it if it was a folder.
  pub fn remove_from_index(&mut self, path: &str) -> Result<(), DoinoteError> {
    let path = normalize_path(path);
    let removed = self.detach(&path);
    trace!("Removed {removed} index entries for {path}");
    self.persist()
  }

  /// Applies one file system event.
  pub fn apply(&mut self, vault: &dyn FileStore, event: &VaultEvent) -> Result<(), DoinoteError> {
    debug!("Applying {event:?}");
    match event {
      // A folder moved in from outside the vault brings its notes along.
      VaultEvent::Created(path) if vault.entry_kind(path) == Some(EntryKind::Folder) => {
        self.rebuild(vault)
      },
      VaultEvent::Created(path) | VaultEvent::Modified(path) => self.update_index_for_file(vault, path),
      VaultEvent::Deleted(path) => self.remove_from_index(path),
      VaultEvent::Renamed { from, to } => {
        if vault.entry_kind(to) == Some(EntryKind::Folder) {
          // Every note below the folder moved; cheaper to start over than to patch each one.
          return self.rebuild(vault);
        }
        self.remove_from_index(from)?;
        self.update_index_for_file(vault, to)
      },
    }
  }

  /// Looks for an existing note with the same DOI or, failing that, the same title.
  pub fn find_duplicate(&self, query: &DuplicateQuery<'_>) -> Option<DuplicateMatch> {
    let by_doi = query.doi.map(doi_key).filter(|key| !key.is_empty()).and_then(|key| {
      self.data.by_doi.get(&key).map(|path| DuplicateMatch { kind: MatchKind::Doi, path: path.clone() })
    });
    by_doi.or_else(|| {
      query.title.map(title_key).filter(|key| !key.is_empty()).and_then(|key| {
        self
          .data
          .by_title
          .get(&key)
          .map(|path| DuplicateMatch { kind: MatchKind::Title, path: path.clone() })
      })
    })
  }

  /// Reads a note's DOI and title and points their keys at it.
  fn insert_entries(&mut self, vault: &dyn FileStore, path: &str) {
    let fields = vault.frontmatter(path).unwrap_or_default();

    let doi = fields.get("doi").map(|doi| doi_key(doi)).unwrap_or_default();
    if !doi.is_empty() {
      if let Some(previous) = self.data.by_doi.insert(doi.clone(), path.to_string()) {
        if previous != path {
          debug!("DOI {doi} moved from {previous} to {path}");
        }
      }
    }

    let title = fields
      .get("title")
      .map(|title| title_key(title))
      .filter(|title| !title.is_empty())
      .unwrap_or_else(|| title_key(&file_stem(path)));
    if !title.is_empty() {
      if let Some(previous) = self.data.by_title.insert(title.clone(), path.to_string()) {
        if previous != path {
          debug!("Title {title:?} moved from {previous} to {path}");
        }
      }
    }
  }

  /// Removes every entry pointing at `path` or below it, returning how many went.
  fn detach(&mut self, path: &str) -> usize {
    let prefix = format!("{path}/");
    let points_here = |target: &String| target == path || target.starts_with(&prefix);
    let before = self.data.by_doi.len() + self.data.by_title.len();
    self.data.by_doi.retain(|_, target| !points_here(target));
    self.data.by_title.retain(|_, target| !points_here(target));
    before - self.data.by_doi.len() - self.data.by_title.len()
  }

  /// Writes the whole index back to the state store.
  fn persist(&self) -> Result<(), DoinoteError> { self.store.save_index(&self.data) }
}
