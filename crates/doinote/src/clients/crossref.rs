//! Client implementation for fetching paper metadata from Crossref by DOI.
//!
//! The client uses Crossref's REST API (https://api.crossref.org/) and identifies itself with a
//! descriptive `User-Agent`, optionally carrying a contact address so requests are routed to the
//! "polite" pool. Crossref's rich and loosely populated `work` record is decoded into an
//! all-optional intermediate schema and then normalized into [`PaperMetadata`].
//!
//! # Examples
//!
//! ```no_run
//! use doinote::clients::{CrossrefClient, MetadataSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CrossrefClient::new();
//! let paper = client.fetch_paper("https://doi.org/10.1145/1327452.1327492").await?;
//!
//! println!("Title: {}", paper.title);
//! println!("DOI: {}", paper.doi);
//! # Ok(())
//! # }
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{
  header::{ACCEPT, USER_AGENT},
  StatusCode,
};
use serde_json::Value;
use url::Url;

use super::*;
use crate::{
  doi::{doi_url, normalize_doi},
  paper::normalize_paper,
  settings::DEFAULT_ENDPOINT,
};

lazy_static! {
    /// Any XML or HTML tag, as found in JATS abstracts and titles
    static ref MARKUP: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// Response envelope from the Crossref API.
#[derive(Debug, Deserialize)]
struct CrossrefResponse {
  /// The work metadata
  message: CrossrefWork,
}

/// Metadata about a work from Crossref. Every field may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct CrossrefWork {
  /// Titles, usually exactly one
  title:            Option<Vec<String>>,
  /// Authors in byline order
  author:           Option<Vec<CrossrefAuthor>>,
  /// Abstract, often JATS XML
  #[serde(rename = "abstract")]
  abstract_text:    Option<String>,
  /// Journal or proceedings titles
  container_title:  Option<Vec<String>>,
  /// Volume number
  volume:           Option<String>,
  /// Issue number
  issue:            Option<String>,
  /// Page range
  page:             Option<String>,
  /// Print publication date
  published_print:  Option<CrossrefDate>,
  /// Online publication date
  published_online: Option<CrossrefDate>,
  /// Publisher name
  publisher:        Option<String>,
  /// Print and electronic ISSNs
  #[serde(rename = "ISSN")]
  issn:             Option<Vec<Value>>,
  /// Subject headings
  subject:          Option<Vec<Value>>,
  /// Full-text links
  link:             Option<Vec<CrossrefLink>>,
}

/// Author information from Crossref.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefAuthor {
  /// Given (first) name
  given:  Option<String>,
  /// Family (last) name
  family: Option<String>,
}

/// Date representation in Crossref's API.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefDate {
  /// Date parts in the format [[year, month, day]], where month and day are optional and
  /// Crossref occasionally sends `null` in place of a part
  #[serde(rename = "date-parts")]
  date_parts: Vec<Vec<Option<i64>>>,
}

impl CrossrefDate {
  /// Year and month of the first date, if it has a year.
  fn year_month(&self) -> Option<(i32, Option<u32>)> {
    let parts = self.date_parts.first()?;
    let year = i32::try_from((*parts.first()?)?).ok()?;
    let month = parts.get(1).copied().flatten().and_then(|m| u32::try_from(m).ok());
    Some((year, month))
  }
}

/// A full-text link from Crossref.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefLink {
  /// Where the full text lives
  #[serde(rename = "URL")]
  url:          Option<String>,
  /// MIME type of the full text, `unspecified` when unknown
  #[serde(rename = "content-type")]
  content_type: Option<String>,
}

/// Client for fetching paper metadata using DOIs via the Crossref API.
#[derive(Debug, Clone)]
pub struct CrossrefClient {
  /// Internal web client used to connect to the API.
  client:     reqwest::Client,
  /// The `works` endpoint DOIs are appended to.
  base_url:   String,
  /// Sent with every request.
  user_agent: String,
}

impl CrossrefClient {
  /// Creates a client for the public Crossref API without a contact address.
  pub fn new() -> Self { Self::with_base_url(DEFAULT_ENDPOINT, None) }

  /// Creates a client for any Crossref-compatible `works` endpoint.
  pub fn with_base_url(base_url: &str, mailto: Option<&str>) -> Self {
    Self {
      client:     reqwest::Client::new(),
      base_url:   base_url.to_string(),
      user_agent: Self::user_agent(mailto),
    }
  }

  /// Creates a client for the endpoint and contact address in `settings`.
  pub fn from_settings(settings: &Settings) -> Self {
    Self::with_base_url(&settings.endpoint, settings.mailto.as_deref())
  }

  /// The identifying `User-Agent`, e.g. `doinote/0.1.0 (mailto:me@example.org)`.
  pub fn user_agent(mailto: Option<&str>) -> String {
    let base = format!("doinote/{}", env!("CARGO_PKG_VERSION"));
    match mailto.map(str::trim).filter(|m| !m.is_empty()) {
      Some(mailto) => format!("{base} (mailto:{mailto})"),
      None => base,
    }
  }

  /// The request URL for a DOI: the endpoint plus the DOI as one percent-encoded segment.
  fn works_url(&self, doi: &str) -> Result<Url, DoinoteError> {
    let mut url = Url::parse(&self.base_url)?;
    url
      .path_segments_mut()
      .map_err(|_| DoinoteError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
      .pop_if_empty()
      .push(doi);
    Ok(url)
  }
}

#[async_trait]
impl MetadataSource for CrossrefClient {
  async fn fetch_paper(&self, doi: &str) -> Result<PaperMetadata, DoinoteError> {
    let doi = match normalize_doi(doi) {
      // An empty path segment would hit the works listing instead of a single work.
      empty if empty.is_empty() => return Err(DoinoteError::InvalidDoi(doi.to_string())),
      doi => doi,
    };
    let url = self.works_url(&doi)?;
    debug!("Fetching from Crossref via: {}", url);

    let response = self
      .client
      .get(url)
      .header(ACCEPT, "application/json")
      .header(USER_AGENT, &self.user_agent)
      .send()
      .await?;
    let status = response.status();
    debug!("Crossref response status: {}", status);
    if status != StatusCode::OK {
      return Err(DoinoteError::Fetch { status: status.as_u16(), doi });
    }

    let text = response.text().await?;
    trace!("Crossref response: {}", text);

    let response: CrossrefResponse = serde_json::from_str(&text)
      .map_err(|e| DoinoteError::MalformedResponse(format!("Failed to parse JSON: {}", e)))?;
    Ok(map_work(response.message, &doi))
  }
}

impl Default for CrossrefClient {
  fn default() -> Self { Self::new() }
}

/// Removes tag-like markup (e.g. JATS `<jats:p>`) and surrounding whitespace.
fn strip_markup(text: &str) -> String { MARKUP.replace_all(text, "").trim().to_string() }

/// Converts a Crossref work into a normalized record for `doi`.
fn map_work(work: CrossrefWork, doi: &str) -> PaperMetadata {
  let title = work
    .title
    .and_then(|titles| titles.into_iter().next())
    .unwrap_or_else(|| "Untitled".to_string());

  // Authors with neither part still take a (blank) slot so positions match the byline.
  let authors = work
    .author
    .unwrap_or_default()
    .into_iter()
    .map(|author| {
      let name = [author.given, author.family]
        .into_iter()
        .flatten()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
      Value::String(name)
    })
    .collect();

  let (year, month) = work
    .published_print
    .as_ref()
    .and_then(CrossrefDate::year_month)
    .or_else(|| work.published_online.as_ref().and_then(CrossrefDate::year_month))
    .map_or((None, None), |(year, month)| (Some(year), month));

  let canonical = doi_url(doi);
  let links = work.link.unwrap_or_default();
  let pdf_url = links
    .iter()
    .find(|link| {
      link.content_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("application/pdf"))
    })
    .or_else(|| links.first())
    .and_then(|link| link.url.clone())
    .filter(|url| !url.is_empty())
    .unwrap_or_else(|| canonical.clone());

  normalize_paper(PartialPaper {
    title: Some(title),
    authors: Some(authors),
    abstract_text: work.abstract_text.as_deref().map(strip_markup),
    journal: work.container_title.and_then(|titles| titles.into_iter().next()),
    volume: work.volume,
    issue: work.issue,
    pages: work.page,
    year,
    month,
    doi: Some(doi.to_string()),
    doi_url: Some(canonical),
    pdf_url: Some(pdf_url),
    publisher: work.publisher,
    issn: work.issn,
    subjects: work.subject,
  })
}
