//! DOI parsing and normalization.
//!
//! A DOI can reach us in several spellings:
//! - bare: `10.1145/1327452.1327492`
//! - as a URL: `https://doi.org/10.1145/1327452.1327492`, `http://dx.doi.org/...`, `doi.org/...`
//! - with a scheme-like prefix: `doi:10.1145/1327452.1327492`
//!
//! All of them normalize to the same lowercase, prefix-free string, which is what the metadata
//! service is queried with and what the duplicate index is keyed by.
//!
//! # Examples
//!
//! ```
//! use doinote::doi::normalize_doi;
//!
//! assert_eq!(normalize_doi("https://doi.org/10.1/A"), "10.1/a");
//! assert_eq!(normalize_doi("doi:10.1/a"), "10.1/a");
//! assert_eq!(normalize_doi("10.1/a"), "10.1/a");
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use super::*;

lazy_static! {
    /// A resolver URL or `doi:` scheme in front of a DOI
    static ref DOI_PREFIX: Regex = Regex::new(r"(?i)^(?:(?:https?://)?(?:dx\.)?doi\.org/|doi:)\s*").unwrap();
    /// `10.NNNN/suffix`, with optional dotted sub-prefixes
    static ref DOI_SHAPE: Regex = Regex::new(r"^10\.\d{4,}(?:\.\d+)*/.+$").unwrap();
}

/// Base of every canonical DOI link.
pub const DOI_RESOLVER: &str = "https://doi.org/";

/// Normalizes user input into a DOI, leniently.
///
/// Strips any `https?://(dx.)?doi.org/` or `doi:` prefix (case-insensitive) and lowercases the
/// result. Input that has no prefix and does not look like a DOI is returned trimmed but
/// otherwise untouched, so the metadata service gets to reject it. Normalizing twice gives the
/// same result as normalizing once.
pub fn normalize_doi(input: &str) -> String {
  let mut rest = input.trim();
  let mut stripped = false;
  while let Some(m) = DOI_PREFIX.find(rest) {
    rest = rest[m.end()..].trim();
    stripped = true;
  }

  if stripped || DOI_SHAPE.is_match(rest) {
    rest.to_lowercase()
  } else {
    debug!("Input does not look like a DOI, passing through: {rest}");
    rest.to_string()
  }
}

/// Parses user input into a DOI, rejecting anything without the `10.NNNN/suffix` shape.
///
/// # Errors
///
/// Returns [`DoinoteError::InvalidDoi`] if the normalized input is not a DOI.
pub fn parse_doi(input: &str) -> Result<String, DoinoteError> {
  let doi = normalize_doi(input);
  if DOI_SHAPE.is_match(&doi) {
    Ok(doi)
  } else {
    Err(DoinoteError::InvalidDoi(input.trim().to_string()))
  }
}

/// Builds the canonical `https://doi.org/{doi}` link.
pub fn doi_url(doi: &str) -> String { format!("{DOI_RESOLVER}{doi}") }
