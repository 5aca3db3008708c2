//! Error types for the doinoted CLI application.
//!
//! Everything the CLI can fail with is folded into [`DoinotedErrors`]:
//! - Import, index and settings errors from the library
//! - File system operations
//! - Printing settings as JSON
//!
//! The variants are transparent so the underlying message reaches the user unchanged.
//! Prompt failures surface as [`doinote::errors::DoinoteError::Prompt`].

use thiserror::Error;

/// Errors that can occur during CLI operations.
///
/// # Examples
///
/// ```ignore
/// # fn example() -> Result<(), DoinotedErrors> {
/// std::fs::create_dir_all("notes")?;
/// let doi = doinote::doi::parse_doi("https://doi.org/10.1038/s41586-020-2649-2")?;
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum DoinotedErrors {
  /// Errors from the underlying doinote library
  #[error(transparent)]
  Doinote(#[from] doinote::errors::DoinoteError),

  /// File system and IO operation errors
  #[error(transparent)]
  IO(#[from] std::io::Error),

  /// Settings could not be serialized for display
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}
