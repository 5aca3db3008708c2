//! Keeping the duplicate index in step with the vault while it changes underneath us.
//!
//! File system notifications from [`notify`] are translated into [`VaultEvent`]s and applied to
//! the index one at a time by [`run`], which owns the index for as long as it is watching.

use notify::{
  event::{ModifyKind, RenameMode},
  Event, EventKind, RecursiveMode, Watcher,
};
use tokio::sync::mpsc;

use super::*;
use crate::{
  index::DuplicateIndex,
  vault::{is_markdown, LocalVault},
};

/// A change to the vault that may affect the duplicate index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
  /// A note appeared
  Created(String),
  /// A note's content changed
  Modified(String),
  /// A note or folder went away
  Deleted(String),
  /// A note or folder moved
  Renamed {
    /// Vault path before the move
    from: String,
    /// Vault path after the move
    to:   String,
  },
}

/// Translates a raw notification into vault events.
///
/// Creations and modifications of anything other than Markdown notes are dropped, since they
/// cannot carry index keys. Deletions and renames are kept whatever they name because a folder
/// may have taken notes with it, and a folder moved in from outside arrives as `Created`.
/// Paths outside the vault are ignored.
pub fn translate(event: &Event, vault: &LocalVault) -> Vec<VaultEvent> {
  let paths: Vec<Option<String>> = event.paths.iter().map(|p| vault.relative(p)).collect();
  let notes = || paths.iter().flatten().filter(|p| is_markdown(p)).cloned();
  let any = || paths.iter().flatten().cloned();

  match event.kind {
    EventKind::Create(_) => notes().map(VaultEvent::Created).collect(),
    EventKind::Remove(_) => any().map(VaultEvent::Deleted).collect(),
    EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match paths.as_slice() {
      [Some(from), Some(to)] => vec![VaultEvent::Renamed { from: from.clone(), to: to.clone() }],
      [Some(from), None] => vec![VaultEvent::Deleted(from.clone())],
      [None, Some(to)] => vec![VaultEvent::Created(to.clone())],
      _ => Vec::new(),
    },
    EventKind::Modify(ModifyKind::Name(RenameMode::From)) => any().map(VaultEvent::Deleted).collect(),
    EventKind::Modify(ModifyKind::Name(_)) => any().map(VaultEvent::Created).collect(),
    EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) =>
      notes().map(VaultEvent::Modified).collect(),
    _ => Vec::new(),
  }
}

/// Watches the vault and applies every change to `index` until Ctrl-C is pressed.
///
/// Events are applied strictly one after another. A failure to apply one event is logged and
/// does not stop the watch.
pub async fn run(vault: &LocalVault, index: &mut DuplicateIndex) -> Result<(), DoinoteError> {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
    // The receiver only goes away when we stop watching.
    let _ = tx.send(res);
  })?;
  watcher.watch(vault.root(), RecursiveMode::Recursive)?;
  info!("Watching {} for changes", vault.root().display());

  let shutdown = tokio::signal::ctrl_c();
  tokio::pin!(shutdown);

  loop {
    tokio::select! {
      received = rx.recv() => match received {
        Some(Ok(event)) => {
          trace!("Raw event: {event:?}");
          for change in translate(&event, vault) {
            if let Err(e) = index.apply(vault, &change) {
              warn!("Failed to apply {change:?} to the duplicate index: {e}");
            }
          }
        },
        Some(Err(e)) => warn!("Watcher error: {e}"),
        None => break,
      },
      _ = &mut shutdown => {
        info!("Stopping watch");
        break;
      },
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use notify::event::{CreateKind, DataChange, RemoveKind};

  use super::*;

  fn vault() -> LocalVault { LocalVault::new("/vault") }

  fn event(kind: EventKind, paths: &[&str]) -> Event {
    paths.iter().fold(Event::new(kind), |event, p| event.add_path(PathBuf::from(p)))
  }

  #[test]
  fn test_create_only_reports_notes() {
    let vault = vault();
    let created = event(EventKind::Create(CreateKind::File), &["/vault/Papers/A.md"]);
    assert_eq!(translate(&created, &vault), vec![VaultEvent::Created("Papers/A.md".into())]);

    let state = event(EventKind::Create(CreateKind::File), &["/vault/.doinote/state.json"]);
    assert!(translate(&state, &vault).is_empty());

    let folder = event(EventKind::Create(CreateKind::Folder), &["/vault/Papers"]);
    assert!(translate(&folder, &vault).is_empty());
  }

  #[test]
  fn test_remove_reports_folders_too() {
    let removed = event(EventKind::Remove(RemoveKind::Folder), &["/vault/Papers/2024"]);
    assert_eq!(translate(&removed, &vault()), vec![VaultEvent::Deleted("Papers/2024".into())]);
  }

  #[test]
  fn test_rename_kinds() {
    let vault = vault();
    let both = event(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), &[
      "/vault/Papers/Old.md",
      "/vault/Papers/New.md",
    ]);
    assert_eq!(translate(&both, &vault), vec![VaultEvent::Renamed {
      from: "Papers/Old.md".into(),
      to:   "Papers/New.md".into(),
    }]);

    let moved_in = event(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), &[
      "/elsewhere/A.md",
      "/vault/Papers/A.md",
    ]);
    assert_eq!(translate(&moved_in, &vault), vec![VaultEvent::Created("Papers/A.md".into())]);

    let from = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/vault/Papers/A.md"]);
    assert_eq!(translate(&from, &vault), vec![VaultEvent::Deleted("Papers/A.md".into())]);

    let to = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/vault/Papers/B.md"]);
    assert_eq!(translate(&to, &vault), vec![VaultEvent::Created("Papers/B.md".into())]);

    let folder_in = event(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), &[
      "/elsewhere/Batch",
      "/vault/Papers/Batch",
    ]);
    assert_eq!(translate(&folder_in, &vault), vec![VaultEvent::Created("Papers/Batch".into())]);

    let folder_to = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/vault/Papers/Batch"]);
    assert_eq!(translate(&folder_to, &vault), vec![VaultEvent::Created("Papers/Batch".into())]);
  }

  #[test]
  fn test_content_changes() {
    let vault = vault();
    let modified =
      event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/vault/Papers/A.md"]);
    assert_eq!(translate(&modified, &vault), vec![VaultEvent::Modified("Papers/A.md".into())]);

    let access = event(EventKind::Access(notify::event::AccessKind::Any), &["/vault/Papers/A.md"]);
    assert!(translate(&access, &vault).is_empty());
  }
}
