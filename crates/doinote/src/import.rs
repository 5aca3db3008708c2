//! The end-to-end import: DOI in, note out.
//!
//! An import moves through these states:
//!
//! ```text
//! Idle → AwaitingInput → Fetching → CheckingDuplicate ─┬→ Writing → Done
//!                            │              │          └→ Cancelled
//!                            └──────────────┴──────────────→ Failed
//! ```
//!
//! and then returns to `Idle`. Nothing is retried. When a duplicate is found and confirmation
//! is enabled, the import waits on a [`DuplicatePrompt`] before going on.

use super::*;
use crate::{
  clients::MetadataSource,
  doi::normalize_doi,
  index::{DuplicateIndex, DuplicateMatch, DuplicateQuery},
  render::render_note,
  writer::NoteWriter,
};

/// Where an import currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
  /// Nothing in flight
  Idle,
  /// Waiting for DOI text
  AwaitingInput,
  /// Talking to the metadata service
  Fetching,
  /// Looking the paper up in the duplicate index, possibly asking the user
  CheckingDuplicate,
  /// The user declined to import a duplicate
  Cancelled,
  /// Rendering and writing the note
  Writing,
  /// The note was written
  Done,
  /// Something went wrong; the error was returned to the caller
  Failed,
}

/// How an import ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
  /// A note was written.
  Created {
    /// Vault path of the new note
    path:  String,
    /// The metadata it was rendered from
    paper: PaperMetadata,
  },
  /// The paper was already imported and the user chose not to import it again.
  Cancelled(DuplicateMatch),
}

/// Asks the user whether to import a paper that is already in the vault.
#[async_trait]
pub trait DuplicatePrompt: Send + Sync {
  /// Returns `true` to import anyway.
  async fn confirm(&self, duplicate: &DuplicateMatch, paper: &PaperMetadata) -> Result<bool, DoinoteError>;
}

/// A prompt that always imports.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl DuplicatePrompt for AcceptAll {
  async fn confirm(&self, _: &DuplicateMatch, _: &PaperMetadata) -> Result<bool, DoinoteError> { Ok(true) }
}

/// A prompt that never imports a duplicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineAll;

#[async_trait]
impl DuplicatePrompt for DeclineAll {
  async fn confirm(&self, _: &DuplicateMatch, _: &PaperMetadata) -> Result<bool, DoinoteError> { Ok(false) }
}

/// Drives imports against one vault.
pub struct Importer<'a> {
  /// Where metadata comes from
  source:      &'a dyn MetadataSource,
  /// Where notes go
  vault:       &'a dyn FileStore,
  /// Who decides about duplicates
  prompt:      &'a dyn DuplicatePrompt,
  /// User configuration
  settings:    &'a Settings,
  /// Current state
  state:       ImportState,
  /// States visited by the most recent import, in order
  transitions: Vec<ImportState>,
}

impl<'a> Importer<'a> {
  /// Creates an idle importer.
  pub fn new(
    source: &'a dyn MetadataSource,
    vault: &'a dyn FileStore,
    prompt: &'a dyn DuplicatePrompt,
    settings: &'a Settings,
  ) -> Self {
    Self { source, vault, prompt, settings, state: ImportState::Idle, transitions: Vec::new() }
  }

  /// The current state; `Idle` between imports.
  pub fn state(&self) -> ImportState { self.state }

  /// Every state the most recent import went through, ending with `Idle`.
  pub fn transitions(&self) -> &[ImportState] { &self.transitions }

  /// Imports the paper named by `input` (a DOI or DOI URL).
  ///
  /// # Errors
  ///
  /// Returns [`DoinoteError::EmptyInput`] for blank input or a bare DOI prefix, and otherwise
  /// whatever the fetch, the prompt or the write failed with. A failed import never touches the
  /// index.
  pub async fn import(
    &mut self,
    index: &mut DuplicateIndex,
    input: &str,
  ) -> Result<ImportOutcome, DoinoteError> {
    self.transitions.clear();
    self.enter(ImportState::AwaitingInput);

    // A bare `doi:` or resolver URL names nothing either.
    let doi = normalize_doi(input);
    if doi.is_empty() {
      self.enter(ImportState::Idle);
      return Err(DoinoteError::EmptyInput);
    }

    let result = self.run(index, &doi).await;
    match &result {
      Ok(ImportOutcome::Created { .. }) => self.enter(ImportState::Done),
      Ok(ImportOutcome::Cancelled(_)) => self.enter(ImportState::Cancelled),
      Err(e) => {
        warn!("Import of {doi} failed: {e}");
        self.enter(ImportState::Failed);
      },
    }
    self.enter(ImportState::Idle);
    result
  }

  /// Fetch, check, write. Terminal states are entered by the caller.
  async fn run(&mut self, index: &mut DuplicateIndex, doi: &str) -> Result<ImportOutcome, DoinoteError> {
    self.enter(ImportState::Fetching);
    let paper = self.source.fetch_paper(doi).await?;
    info!("Fetched {:?} ({})", paper.title, paper.doi);

    self.enter(ImportState::CheckingDuplicate);
    let query = DuplicateQuery { doi: Some(&paper.doi), title: Some(&paper.title) };
    if let Some(duplicate) = index.find_duplicate(&query) {
      if self.settings.confirm_duplicates {
        if !self.prompt.confirm(&duplicate, &paper).await? {
          info!("Skipping {}: already imported as {}", paper.doi, duplicate.path);
          return Ok(ImportOutcome::Cancelled(duplicate));
        }
      } else {
        warn!("Importing {} although it matches {} by {}", paper.doi, duplicate.path, duplicate.kind);
      }
    }

    self.enter(ImportState::Writing);
    let today = chrono::Local::now().date_naive();
    let note = render_note(&paper, self.settings, self.vault, today);
    let path = NoteWriter::new(self.vault, &self.settings.folder).write(&note)?;

    if let Err(e) = index.update_index_for_file(self.vault, &path) {
      warn!("Wrote {path} but could not update the duplicate index: {e}");
    }
    Ok(ImportOutcome::Created { path, paper })
  }

  /// Moves to `state`.
  fn enter(&mut self, state: ImportState) {
    trace!("Import state {:?} -> {:?}", self.state, state);
    self.state = state;
    self.transitions.push(state);
  }
}
