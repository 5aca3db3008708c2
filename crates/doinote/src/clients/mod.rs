//! Clients for fetching paper metadata from scholarly metadata services.
//!
//! Every client implements [`MetadataSource`], which is the only thing the import pipeline
//! depends on. The client is responsible for turning whatever the service returns into a
//! fully normalized [`PaperMetadata`]; partial data never leaves it.
//!
//! # Supported Sources
//!
//! - [`crossref`] - Client for the Crossref REST API (`/works/{doi}`)
//!
//! # Examples
//!
//! ```no_run
//! use doinote::clients::{CrossrefClient, MetadataSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let paper = CrossrefClient::new().fetch_paper("10.1145/1327452.1327492").await?;
//! println!("{} ({:?})", paper.title, paper.year);
//! # Ok(())
//! # }
//! ```

pub mod crossref;

pub use crossref::CrossrefClient;

use super::*;

/// A service that can resolve a DOI into paper metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
  /// Fetches the record for `doi`, which may be given in any accepted spelling.
  ///
  /// # Errors
  ///
  /// Fails on network errors, on non-200 responses and on responses that cannot be decoded.
  async fn fetch_paper(&self, doi: &str) -> Result<PaperMetadata, DoinoteError>;
}
