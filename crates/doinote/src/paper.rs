//! Paper metadata types and the normalizer that makes them total.
//!
//! External metadata arrives with any subset of fields present. It is first collected into a
//! [`PartialPaper`], where every field is optional, and then passed through [`normalize_paper`]
//! to produce a [`PaperMetadata`] in which every field has a value. Everything downstream of the
//! fetcher (the renderer, the writer, the index) only ever sees [`PaperMetadata`].
//!
//! # Examples
//!
//! ```
//! use doinote::paper::{normalize_paper, PartialPaper};
//!
//! let paper = normalize_paper(PartialPaper {
//!   title: Some("Example Paper".into()),
//!   year: Some(2020),
//!   ..Default::default()
//! });
//!
//! assert_eq!(paper.title, "Example Paper");
//! assert_eq!(paper.journal, "");
//! assert!(paper.authors.is_empty());
//! assert_eq!(paper.month, None);
//! ```

use serde_json::Value;

use super::*;

/// A complete bibliographic record for one paper.
///
/// Every field is populated: strings default to `""` and lists to empty. Only `year` and
/// `month` can be absent, since an unknown publication date is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperMetadata {
  /// The paper's title
  pub title:         String,
  /// Author names as "Given Family", in the order the source lists them
  pub authors:       Vec<String>,
  /// The abstract with markup removed
  #[serde(rename = "abstract")]
  pub abstract_text: String,
  /// Container title (journal, proceedings, ...)
  pub journal:       String,
  /// Volume
  pub volume:        String,
  /// Issue
  pub issue:         String,
  /// Page range
  pub pages:         String,
  /// Publication year, if known
  pub year:          Option<i32>,
  /// Publication month (1-12), if known
  pub month:         Option<u32>,
  /// Normalized DOI, lowercase and without any URL prefix
  pub doi:           String,
  /// Canonical `https://doi.org/{doi}` link
  pub doi_url:       String,
  /// Best available full-text link, falling back to `doi_url`
  pub pdf_url:       String,
  /// Publisher name
  pub publisher:     String,
  /// ISSNs of the container
  pub issn:          Vec<String>,
  /// Subject headings, used to derive tags
  pub subjects:      Vec<String>,
}

/// A paper record in which any field may be missing.
///
/// List elements are kept as loose JSON values so that whatever the source sends can be coerced
/// to strings in one place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialPaper {
  /// See [`PaperMetadata::title`]
  pub title:         Option<String>,
  /// Author names; non-string entries are coerced
  pub authors:       Option<Vec<Value>>,
  /// See [`PaperMetadata::abstract_text`]
  #[serde(rename = "abstract")]
  pub abstract_text: Option<String>,
  /// See [`PaperMetadata::journal`]
  pub journal:       Option<String>,
  /// See [`PaperMetadata::volume`]
  pub volume:        Option<String>,
  /// See [`PaperMetadata::issue`]
  pub issue:         Option<String>,
  /// See [`PaperMetadata::pages`]
  pub pages:         Option<String>,
  /// See [`PaperMetadata::year`]
  pub year:          Option<i32>,
  /// See [`PaperMetadata::month`]
  pub month:         Option<u32>,
  /// See [`PaperMetadata::doi`]
  pub doi:           Option<String>,
  /// See [`PaperMetadata::doi_url`]
  pub doi_url:       Option<String>,
  /// See [`PaperMetadata::pdf_url`]
  pub pdf_url:       Option<String>,
  /// See [`PaperMetadata::publisher`]
  pub publisher:     Option<String>,
  /// ISSNs; non-string entries are coerced
  pub issn:          Option<Vec<Value>>,
  /// Subject headings; non-string entries are coerced
  pub subjects:      Option<Vec<Value>>,
}

/// Fills every missing field of a partial record with its default.
///
/// This is total (it accepts any [`PartialPaper`]) and idempotent: feeding an already
/// normalized record back through it returns the same record.
pub fn normalize_paper(partial: PartialPaper) -> PaperMetadata {
  PaperMetadata {
    title:         partial.title.unwrap_or_default(),
    authors:       coerce_strings(partial.authors),
    abstract_text: partial.abstract_text.unwrap_or_default(),
    journal:       partial.journal.unwrap_or_default(),
    volume:        partial.volume.unwrap_or_default(),
    issue:         partial.issue.unwrap_or_default(),
    pages:         partial.pages.unwrap_or_default(),
    year:          partial.year,
    month:         partial.month,
    doi:           partial.doi.unwrap_or_default(),
    doi_url:       partial.doi_url.unwrap_or_default(),
    pdf_url:       partial.pdf_url.unwrap_or_default(),
    publisher:     partial.publisher.unwrap_or_default(),
    issn:          coerce_strings(partial.issn),
    subjects:      coerce_strings(partial.subjects),
  }
}

/// Turns an optional list of loose JSON values into a list of strings.
fn coerce_strings(values: Option<Vec<Value>>) -> Vec<String> {
  values.unwrap_or_default().into_iter().map(coerce_string).collect()
}

/// Renders one JSON value as a plain string.
fn coerce_string(value: Value) -> String {
  match value {
    Value::String(s) => s,
    Value::Null => String::new(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    other => other.to_string(),
  }
}

impl From<PaperMetadata> for PartialPaper {
  fn from(paper: PaperMetadata) -> Self {
    let loose = |values: Vec<String>| Some(values.into_iter().map(Value::String).collect());
    Self {
      title:         Some(paper.title),
      authors:       loose(paper.authors),
      abstract_text: Some(paper.abstract_text),
      journal:       Some(paper.journal),
      volume:        Some(paper.volume),
      issue:         Some(paper.issue),
      pages:         Some(paper.pages),
      year:          paper.year,
      month:         paper.month,
      doi:           Some(paper.doi),
      doi_url:       Some(paper.doi_url),
      pdf_url:       Some(paper.pdf_url),
      publisher:     Some(paper.publisher),
      issn:          loose(paper.issn),
      subjects:      loose(paper.subjects),
    }
  }
}

impl PaperMetadata {
  /// Runs the record back through [`normalize_paper`].
  pub fn normalized(self) -> Self { normalize_paper(self.into()) }

  /// Surname of the first author: the last whitespace-separated word with trailing punctuation
  /// removed. Empty when there are no authors.
  pub fn first_author_surname(&self) -> String {
    self
      .authors
      .first()
      .and_then(|name| name.split_whitespace().last())
      .map(|word| word.trim_end_matches(|c: char| c.is_ascii_punctuation()).to_string())
      .unwrap_or_default()
  }

  /// First author's surname, followed by ` et al.` when the paper has more than one author.
  pub fn first_authors(&self) -> String {
    let surname = self.first_author_surname();
    if self.authors.len() > 1 && !surname.is_empty() {
      format!("{surname} et al.")
    } else {
      surname
    }
  }
}
