//! Rendering a [`PaperMetadata`] into the pieces of a note.
//!
//! A note is made of three parts, each driven by [`Settings`]:
//! - YAML frontmatter listing the selected [`MetadataField`]s, see [`render_frontmatter`]
//! - a filename built from a `{{token}}` template, see [`render_filename`]
//! - a body built from an optional user template file, see [`render_body`]
//!
//! # Examples
//!
//! ```
//! use doinote::{render::render_frontmatter, settings::MetadataField, PaperMetadata};
//!
//! let paper = PaperMetadata {
//!   title: "Example Paper".into(),
//!   authors: vec!["Jane Doe".into()],
//!   year: Some(2020),
//!   ..Default::default()
//! };
//! let frontmatter =
//!   render_frontmatter(&paper, &[MetadataField::Title, MetadataField::Authors, MetadataField::Year], None);
//! assert_eq!(frontmatter, "---\ntitle: \"Example Paper\"\nauthors:\n  - \"Jane Doe\"\nyear: 2020\n---");
//! ```

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::*;
use crate::{
  format::{format_tag, quote, sanitize_filename},
  settings::MetadataField,
};

lazy_static! {
    /// A `{{token}}` placeholder, whitespace allowed inside the braces
    static ref TOKEN: Regex = Regex::new(r"\{\{\s*([A-Za-z_]+)\s*\}\}").unwrap();
}

/// Frontmatter key of the import date stamp.
pub const DATE_IMPORTED_KEY: &str = "date_imported";

/// A note ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNote {
  /// Sanitized filename without the `.md` extension
  pub filename:    String,
  /// Frontmatter block including its `---` delimiters
  pub frontmatter: String,
  /// Body text, possibly empty
  pub body:        String,
}

impl RenderedNote {
  /// The full file content: frontmatter, a blank line, then the body.
  pub fn content(&self) -> String { format!("{}\n\n{}", self.frontmatter, self.body) }
}

/// Renders every part of a note.
///
/// `today` is stamped as `date_imported` when [`Settings::add_import_date`] is set and is
/// available to body templates.
pub fn render_note(
  paper: &PaperMetadata,
  settings: &Settings,
  vault: &dyn FileStore,
  today: NaiveDate,
) -> RenderedNote {
  let import_date = settings.add_import_date.then_some(today);
  RenderedNote {
    filename:    render_filename(&settings.filename_template, paper),
    frontmatter: render_frontmatter(paper, &settings.selected_fields(), import_date),
    body:        render_body(paper, settings.body_template.as_deref(), vault, today),
  }
}

/// How a single field appears in the frontmatter.
enum FieldValue {
  /// `key: value`, with the value already formatted
  Scalar(String),
  /// `key:` followed by `  - item` lines, items already formatted
  List(Vec<String>),
}

/// The frontmatter value of a field, or `None` when the paper has nothing for it.
fn field_value(field: MetadataField, paper: &PaperMetadata) -> Option<FieldValue> {
  let text = |value: &str| (!value.is_empty()).then(|| FieldValue::Scalar(quote(value)));
  let list = |values: Vec<String>| (!values.is_empty()).then_some(FieldValue::List(values));

  match field {
    MetadataField::Title => text(&paper.title),
    MetadataField::Authors => list(paper.authors.iter().map(|a| quote(a)).collect()),
    MetadataField::Journal => text(&paper.journal),
    MetadataField::Year => paper.year.map(|year| FieldValue::Scalar(year.to_string())),
    MetadataField::Volume => text(&paper.volume),
    MetadataField::Issue => text(&paper.issue),
    MetadataField::Pages => text(&paper.pages),
    MetadataField::Publisher => text(&paper.publisher),
    MetadataField::Doi => text(&paper.doi),
    MetadataField::Url => text(&paper.doi_url),
    MetadataField::Pdf => text(&paper.pdf_url),
    MetadataField::Issn => list(paper.issn.iter().map(|i| quote(i)).collect()),
    MetadataField::Tags => list(
      paper.subjects.iter().map(|s| format_tag(s)).filter(|tag| !tag.is_empty()).collect(),
    ),
  }
}

/// Builds the `---`-delimited YAML frontmatter for the given fields, in order.
///
/// Fields without a value are left out, as are repeats of a field already emitted. When
/// `import_date` is given a `date_imported: YYYY-MM-DD` line is appended regardless of `fields`.
pub fn render_frontmatter(
  paper: &PaperMetadata,
  fields: &[MetadataField],
  import_date: Option<NaiveDate>,
) -> String {
  let mut lines = vec!["---".to_string()];
  let mut seen = HashSet::new();

  for &field in fields {
    if !seen.insert(field) {
      continue;
    }
    match field_value(field, paper) {
      Some(FieldValue::Scalar(value)) => lines.push(format!("{}: {value}", field.key())),
      Some(FieldValue::List(items)) => {
        lines.push(format!("{}:", field.key()));
        lines.extend(items.into_iter().map(|item| format!("  - {item}")));
      },
      None => trace!("No value for frontmatter field {field}"),
    }
  }

  if let Some(date) = import_date {
    lines.push(format!("{DATE_IMPORTED_KEY}: {}", date.format("%Y-%m-%d")));
  }

  lines.push("---".to_string());
  lines.join("\n")
}

/// Replaces every `{{token}}` in `template` using `lookup` on the lowercased token name.
fn fill_tokens(template: &str, lookup: impl Fn(&str) -> String) -> String {
  TOKEN.replace_all(template, |caps: &Captures| lookup(&caps[1].to_lowercase())).into_owned()
}

/// Renders a filename template into a sanitized filename (without extension).
///
/// Supported tokens are `title`, `year`, `doi`, `first_author` (surname of the first author),
/// and `first_authors`/`authors` (the same surname, followed by ` et al.` for papers with more
/// than one author). Anything else renders as nothing. An empty result falls back to the
/// title, and an empty title to `Untitled`.
pub fn render_filename(template: &str, paper: &PaperMetadata) -> String {
  let rendered = fill_tokens(template, |token| match token {
    "title" => paper.title.clone(),
    "year" => paper.year.map(|y| y.to_string()).unwrap_or_default(),
    "doi" => paper.doi.clone(),
    "first_author" => paper.first_author_surname(),
    "first_authors" | "authors" => paper.first_authors(),
    _ => String::new(),
  });

  let filename = sanitize_filename(&rendered, None);
  if !filename.is_empty() {
    return filename;
  }
  let title = sanitize_filename(&paper.title, None);
  if title.is_empty() {
    "Untitled".to_string()
  } else {
    title
  }
}

/// Substitutes paper fields into a body template.
///
/// Tokens are case-insensitive; unknown tokens render as nothing.
pub fn fill_body_template(template: &str, paper: &PaperMetadata, today: NaiveDate) -> String {
  fill_tokens(template, |token| match token {
    "title" => paper.title.clone(),
    "year" => paper.year.map(|y| y.to_string()).unwrap_or_default(),
    "month" => paper.month.map(|m| m.to_string()).unwrap_or_default(),
    "doi" => paper.doi.clone(),
    "doiurl" | "doi_url" => paper.doi_url.clone(),
    "pdfurl" | "pdf_url" | "pdf" => paper.pdf_url.clone(),
    "journal" => paper.journal.clone(),
    "volume" => paper.volume.clone(),
    "issue" => paper.issue.clone(),
    "pages" => paper.pages.clone(),
    "publisher" => paper.publisher.clone(),
    "abstract" => paper.abstract_text.clone(),
    "authors" => paper.authors.join(", "),
    "first_authors" => paper.first_authors(),
    "first_author" => paper.first_author_surname(),
    "subjects" => paper.subjects.join(", "),
    "issn" => paper.issn.join(", "),
    "tags" => paper.subjects.iter().map(|s| format_tag(s)).collect::<Vec<_>>().join(" "),
    "date" | "date_imported" => today.format("%Y-%m-%d").to_string(),
    _ => String::new(),
  })
}

/// Reads a body template from the vault.
///
/// # Errors
///
/// Returns [`DoinoteError::TemplateRead`] when the file is missing or unreadable.
pub fn read_body_template(vault: &dyn FileStore, path: &str) -> Result<String, DoinoteError> {
  vault
    .read_to_string(path)
    .map_err(|source| DoinoteError::TemplateRead { path: path.to_string(), source })
}

/// Renders the note body.
///
/// Without a configured template the body is empty. An unreadable template is logged and also
/// yields an empty body, so a broken template never blocks an import.
pub fn render_body(
  paper: &PaperMetadata,
  template_path: Option<&str>,
  vault: &dyn FileStore,
  today: NaiveDate,
) -> String {
  let Some(path) = template_path.map(str::trim).filter(|p| !p.is_empty()) else {
    return String::new();
  };
  match read_body_template(vault, path) {
    Ok(template) => fill_body_template(&template, paper, today),
    Err(e) => {
      warn!("{e}; using an empty body");
      String::new()
    },
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;
  use crate::vault::LocalVault;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 9).unwrap() }

  fn paper() -> PaperMetadata {
    PaperMetadata {
      title: "Array programming with \"NumPy\"".into(),
      authors: vec!["Charles R. Harris".into(), "K. Jarrod Millman".into()],
      abstract_text: "Array programming provides a powerful syntax.".into(),
      journal: "Nature".into(),
      volume: "585".into(),
      issue: String::new(),
      pages: "357-362".into(),
      year: Some(2020),
      month: Some(9),
      doi: "10.1038/s41586-020-2649-2".into(),
      doi_url: "https://doi.org/10.1038/s41586-020-2649-2".into(),
      pdf_url: "https://www.nature.com/articles/s41586-020-2649-2.pdf".into(),
      publisher: String::new(),
      issn: Vec::new(),
      subjects: vec!["Multidisciplinary".into(), "General Physics".into()],
    }
  }

  /// Top-level keys of a rendered frontmatter block, in order.
  fn keys(frontmatter: &str) -> Vec<String> {
    frontmatter
      .lines()
      .filter(|line| *line != "---" && !line.starts_with(' '))
      .filter_map(|line| line.split_once(':').map(|(key, _)| key.to_string()))
      .collect()
  }

  #[test]
  fn test_full_frontmatter() {
    let rendered = render_frontmatter(&paper(), &MetadataField::ALL, Some(today()));
    let expected = r#"---
title: "Array programming with \"NumPy\""
authors:
  - "Charles R. Harris"
  - "K. Jarrod Millman"
journal: "Nature"
year: 2020
volume: "585"
pages: "357-362"
doi: "10.1038/s41586-020-2649-2"
url: "https://doi.org/10.1038/s41586-020-2649-2"
pdf: "https://www.nature.com/articles/s41586-020-2649-2.pdf"
tags:
  - multidisciplinary
  - general-physics
date_imported: 2024-03-09
---"#;
    assert_eq!(rendered, expected);
  }

  #[test]
  fn test_emitted_keys_are_selected_and_non_empty() {
    let paper = paper();
    let non_empty: HashSet<MetadataField> =
      MetadataField::ALL.into_iter().filter(|f| field_value(*f, &paper).is_some()).collect();

    for mask in 0u32..(1 << MetadataField::ALL.len()) {
      let fields: Vec<MetadataField> = MetadataField::ALL
        .into_iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, f)| f)
        .collect();

      let expected: Vec<String> =
        fields.iter().filter(|f| non_empty.contains(f)).map(|f| f.key().to_string()).collect();
      assert_eq!(keys(&render_frontmatter(&paper, &fields, None)), expected, "mask {mask:#b}");

      let mut with_date = expected.clone();
      with_date.push(DATE_IMPORTED_KEY.to_string());
      assert_eq!(keys(&render_frontmatter(&paper, &fields, Some(today()))), with_date);
    }
  }

  #[test]
  fn test_frontmatter_is_valid_yaml() {
    let rendered = render_frontmatter(&paper(), &MetadataField::ALL, Some(today()));
    let fields = vault::parse_frontmatter(&format!("{rendered}\n")).unwrap();
    assert_eq!(fields["title"], "Array programming with \"NumPy\"");
    assert_eq!(fields["year"], "2020");
    assert_eq!(fields["doi"], "10.1038/s41586-020-2649-2");
  }

  #[test]
  fn test_frontmatter_with_awkward_subjects_is_valid_yaml() {
    let paper = PaperMetadata {
      subjects: vec![
        "{Bracketed} Subject".into(),
        "[Draft]".into(),
        "&anchor".into(),
        "*alias".into(),
        "!tag".into(),
        "%directive".into(),
        "@mention".into(),
        "'single'".into(),
        "\"double\"".into(),
        "| literal".into(),
        "> folded".into(),
        "key: value".into(),
        "# comment".into(),
        "- dash".into(),
        "{}".into(),
      ],
      ..paper()
    };
    let rendered = render_frontmatter(&paper, &MetadataField::ALL, Some(today()));
    let fields = vault::parse_frontmatter(&format!("{rendered}\n")).unwrap();
    assert_eq!(fields["doi"], "10.1038/s41586-020-2649-2");
    assert_eq!(fields["title"], "Array programming with \"NumPy\"");
    assert!(rendered.contains("tags:\n  - bracketed-subject\n  - draft\n  - anchor\n"));
    // A subject with nothing tag-worthy in it is left out.
    assert!(!rendered.contains("  - \n"));
  }

  #[test]
  fn test_repeated_and_empty_selection() {
    let paper = paper();
    let rendered = render_frontmatter(&paper, &[MetadataField::Doi, MetadataField::Doi], None);
    assert_eq!(keys(&rendered), vec!["doi"]);
    assert_eq!(render_frontmatter(&paper, &[], None), "---\n---");
  }

  #[test]
  fn test_unknown_configured_fields_are_ignored() {
    let settings = Settings {
      fields: vec!["doi".into(), "citations".into(), "year".into()],
      add_import_date: false,
      ..Default::default()
    };
    let dir = tempdir().unwrap();
    let note = render_note(&paper(), &settings, &LocalVault::new(dir.path()), today());
    assert_eq!(keys(&note.frontmatter), vec!["doi", "year"]);
  }

  #[test]
  fn test_filename_tokens() {
    let paper = paper();
    assert_eq!(render_filename("{{title}}", &paper), "Array programming with NumPy");
    assert_eq!(render_filename("{{first_author}} {{year}}", &paper), "Harris 2020");
    assert_eq!(render_filename("{{ First_Authors }} - {{year}}", &paper), "Harris et al. - 2020");
    assert_eq!(render_filename("{{authors}}", &paper), "Harris et al.");
    assert_eq!(render_filename("{{doi}}", &paper), "10.1038s41586-020-2649-2");
    assert_eq!(render_filename("{{nonsense}}{{title}}", &paper), "Array programming with NumPy");

    let single = PaperMetadata { authors: vec!["Jane Doe,".into()], ..paper.clone() };
    assert_eq!(render_filename("{{first_authors}}", &single), "Doe");
  }

  #[test]
  fn test_filename_falls_back_to_title() {
    let paper = paper();
    assert_eq!(render_filename("{{nonsense}}", &paper), "Array programming with NumPy");
    assert_eq!(render_filename("", &paper), "Array programming with NumPy");

    let undated = PaperMetadata { year: None, title: "???".into(), ..paper };
    assert_eq!(render_filename("{{year}}", &undated), "Untitled");
  }

  #[test]
  fn test_body_template_tokens() {
    let template = "# {{TITLE}}\n{{Authors}} ({{year}}) {{journal}}\n{{doi_url}} | {{pdf}} | \
                    {{first_author}}\n{{subjects}}\n{{abstract}}\n{{date}}{{unknown}}";
    let body = fill_body_template(template, &paper(), today());
    assert_eq!(
      body,
      "# Array programming with \"NumPy\"\nCharles R. Harris, K. Jarrod Millman (2020) Nature\n\
       https://doi.org/10.1038/s41586-020-2649-2 | https://www.nature.com/articles/s41586-020-2649-2.pdf | \
       Harris\nMultidisciplinary, General Physics\nArray programming provides a powerful syntax.\n2024-03-09"
    );
  }

  #[test]
  fn test_body_from_vault_template() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let vault = LocalVault::new(dir.path());
    vault.create_folder("Templates")?;
    vault.create_file("Templates/paper.md", "## {{title}}\n\n{{abstract}}\n")?;

    let body = render_body(&paper(), Some("Templates/paper.md"), &vault, today());
    assert_eq!(body, "## Array programming with \"NumPy\"\n\nArray programming provides a powerful syntax.\n");
    assert_eq!(render_body(&paper(), None, &vault, today()), "");
    assert_eq!(render_body(&paper(), Some("  "), &vault, today()), "");
    Ok(())
  }

  #[traced_test]
  #[test]
  fn test_missing_template_falls_back_to_empty_body() {
    let dir = tempdir().unwrap();
    let vault = LocalVault::new(dir.path());
    let body = render_body(&paper(), Some("Templates/missing.md"), &vault, today());
    assert_eq!(body, "");
    assert!(logs_contain("Failed to read body template Templates/missing.md"));
  }

  #[test]
  fn test_note_content_layout() {
    let note = RenderedNote {
      filename:    "X".into(),
      frontmatter: "---\ntitle: \"X\"\n---".into(),
      body:        "Body".into(),
    };
    assert_eq!(note.content(), "---\ntitle: \"X\"\n---\n\nBody");
  }
}
