//! Error types for the doinote library.
//!
//! A single error enum covers every failure mode of an import:
//! - DOI parsing (non-fatal in the lenient path, see [`crate::doi::normalize_doi`])
//! - Fetching and decoding metadata
//! - Placing the note in the vault
//! - Persisting settings and the duplicate index
//!
//! # Examples
//!
//! ```no_run
//! use doinote::{
//!   clients::{CrossrefClient, MetadataSource},
//!   errors::DoinoteError,
//! };
//!
//! # async fn example() -> Result<(), DoinoteError> {
//! let client = CrossrefClient::new();
//! match client.fetch_paper("10.1000/does-not-exist").await {
//!   Err(DoinoteError::Fetch { status, .. }) => println!("service answered {status}"),
//!   Err(DoinoteError::Network(e)) => println!("network error: {e}"),
//!   Err(e) => println!("other error: {e}"),
//!   Ok(paper) => println!("found {}", paper.title),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

/// Errors that can occur while importing papers as notes.
#[derive(Error, Debug)]
pub enum DoinoteError {
  /// The input does not have the shape of a DOI.
  ///
  /// Returned by the strict [`crate::doi::parse_doi`], and by the metadata client when nothing
  /// is left after stripping the prefix. The import path passes other unrecognized input through
  /// and lets the metadata service reject it.
  #[error("Invalid DOI: {0}")]
  InvalidDoi(String),

  /// The import was started without any DOI text.
  #[error("No DOI was given")]
  EmptyInput,

  /// The metadata service answered with a non-200 status.
  #[error("Metadata request for {doi} failed with HTTP status {status}")]
  Fetch {
    /// The HTTP status code returned by the service
    status: u16,
    /// The normalized DOI that was requested
    doi:    String,
  },

  /// A network request failed before a response arrived.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// The metadata service answered with something that is not the expected JSON.
  #[error("Malformed metadata response: {0}")]
  MalformedResponse(String),

  /// Failed to parse the configured endpoint.
  #[error(transparent)]
  InvalidUrl(#[from] url::ParseError),

  /// The configured note folder exists but is a file.
  #[error("Cannot use {path} as the note folder: a file with that name exists")]
  PathConflict {
    /// Vault-relative path of the conflicting file
    path: String,
  },

  /// The body template could not be read.
  ///
  /// The renderer recovers from this by falling back to an empty body.
  #[error("Failed to read body template {path}: {source}")]
  TemplateRead {
    /// Vault-relative path of the template
    path:   String,
    /// Underlying IO failure
    #[source]
    source: std::io::Error,
  },

  /// Creating a note or folder failed.
  #[error("Failed to write {path}: {source}")]
  Write {
    /// Vault-relative path that could not be written
    path:   String,
    /// Underlying IO failure
    #[source]
    source: std::io::Error,
  },

  /// The duplicate confirmation could not be obtained from the user.
  #[error("Duplicate confirmation failed: {0}")]
  Prompt(String),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// Persisted state could not be encoded or decoded.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The file watcher failed.
  #[error(transparent)]
  Watch(#[from] notify::Error),

  /// A vault enumeration pattern was rejected.
  #[error(transparent)]
  Glob(#[from] glob::PatternError),
}

impl DoinoteError {
  /// Returns the HTTP status carried by a fetch failure, if any.
  ///
  /// Network errors that did receive a response (e.g. from `error_for_status`) report their
  /// status as well.
  pub fn http_status(&self) -> Option<u16> {
    match self {
      DoinoteError::Fetch { status, .. } => Some(*status),
      DoinoteError::Network(e) => e.status().map(|s| s.as_u16()),
      _ => None,
    }
  }
}
