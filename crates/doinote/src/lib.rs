//! A library for turning a DOI into a Markdown note populated with bibliographic metadata,
//! with a duplicate index that keeps the same paper from being imported twice.
//!
//! The pipeline is:
//! - [`clients::CrossrefClient`] resolves a DOI into a [`PaperMetadata`] record
//! - [`index::DuplicateIndex`] checks whether the DOI or title is already in the vault
//! - [`render`] turns the record into frontmatter, a filename and a body
//! - [`writer::NoteWriter`] places the note in the configured folder without clobbering
//! - [`import::Importer`] drives the whole flow
//!
//! # Example
//! ```rust,no_run
//! use doinote::{
//!   clients::CrossrefClient,
//!   import::{AcceptAll, Importer},
//!   index::DuplicateIndex,
//!   state::StateStore,
//!   vault::LocalVault,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   let vault = LocalVault::new("notes");
//!   let store = StateStore::for_vault(&vault);
//!   let settings = store.load_settings()?;
//!   let mut index = DuplicateIndex::load(store, &vault, &settings.folder)?;
//!
//!   let client = CrossrefClient::from_settings(&settings);
//!   let mut importer = Importer::new(&client, &vault, &AcceptAll, &settings);
//!   let outcome = importer.import(&mut index, "10.1038/s41586-020-2649-2").await?;
//!   println!("{outcome:?}");
//!
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  collections::BTreeMap,
  fmt,
  path::{Path, PathBuf},
  str::FromStr,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod clients;
pub mod doi;
pub mod errors;
pub mod format;
pub mod import;
pub mod index;
pub mod paper;
pub mod render;
pub mod settings;
pub mod state;
pub mod vault;
pub mod watch;
pub mod writer;

use errors::DoinoteError;
pub use paper::{PaperMetadata, PartialPaper};
use settings::Settings;
use vault::{EntryKind, FileStore};
