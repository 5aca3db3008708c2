//! User configuration and the fixed vocabulary of frontmatter fields.
//!
//! Settings are persisted as flat camelCase keys (see [`crate::state::StateStore`]) and every
//! key is optional on disk: whatever is missing falls back to [`Settings::default`].

use super::*;

/// Default Crossref `works` endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.crossref.org/works";

/// A frontmatter field that can be selected in [`Settings::fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
  /// `title: "..."`
  Title,
  /// `authors:` block list
  Authors,
  /// `journal: "..."`
  Journal,
  /// `year: 2020`
  Year,
  /// `volume: "..."`
  Volume,
  /// `issue: "..."`
  Issue,
  /// `pages: "..."`
  Pages,
  /// `publisher: "..."`
  Publisher,
  /// `doi: "..."`
  Doi,
  /// `url: "https://doi.org/..."`
  Url,
  /// `pdf: "..."`
  Pdf,
  /// `issn:` block list
  Issn,
  /// `tags:` block list derived from subjects
  Tags,
}

impl MetadataField {
  /// Every selectable field, in the default frontmatter order.
  pub const ALL: [MetadataField; 13] = [
    MetadataField::Title,
    MetadataField::Authors,
    MetadataField::Journal,
    MetadataField::Year,
    MetadataField::Volume,
    MetadataField::Issue,
    MetadataField::Pages,
    MetadataField::Publisher,
    MetadataField::Doi,
    MetadataField::Url,
    MetadataField::Pdf,
    MetadataField::Issn,
    MetadataField::Tags,
  ];

  /// The frontmatter key (and configuration name) of this field.
  pub fn key(self) -> &'static str {
    match self {
      MetadataField::Title => "title",
      MetadataField::Authors => "authors",
      MetadataField::Journal => "journal",
      MetadataField::Year => "year",
      MetadataField::Volume => "volume",
      MetadataField::Issue => "issue",
      MetadataField::Pages => "pages",
      MetadataField::Publisher => "publisher",
      MetadataField::Doi => "doi",
      MetadataField::Url => "url",
      MetadataField::Pdf => "pdf",
      MetadataField::Issn => "issn",
      MetadataField::Tags => "tags",
    }
  }
}

impl fmt::Display for MetadataField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.key()) }
}

impl FromStr for MetadataField {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim().to_lowercase();
    MetadataField::ALL.into_iter().find(|field| field.key() == s).ok_or(s)
  }
}

/// User configuration for imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
  /// Vault-relative folder notes are written to
  pub folder:             String,
  /// Template for the note's filename, e.g. `{{first_author}} {{year}} - {{title}}`
  pub filename_template:  String,
  /// Ordered frontmatter field names; names outside [`MetadataField::ALL`] are ignored
  pub fields:             Vec<String>,
  /// Stamp `date_imported` into the frontmatter
  pub add_import_date:    bool,
  /// Ask before importing a paper the index already knows
  pub confirm_duplicates: bool,
  /// Vault-relative path of a body template, if any
  pub body_template:      Option<String>,
  /// Metadata service endpoint the DOI is appended to
  pub endpoint:           String,
  /// Contact address sent in the `User-Agent`, as Crossref's polite pool asks for
  pub mailto:             Option<String>,
  /// Open the note with the system handler after a successful import
  pub open_after_import:  bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      folder:             "Papers".to_string(),
      filename_template:  "{{title}}".to_string(),
      fields:             MetadataField::ALL.iter().map(|f| f.key().to_string()).collect(),
      add_import_date:    true,
      confirm_duplicates: true,
      body_template:      None,
      endpoint:           DEFAULT_ENDPOINT.to_string(),
      mailto:             None,
      open_after_import:  false,
    }
  }
}

impl Settings {
  /// The configured fields that belong to the vocabulary, in configured order.
  pub fn selected_fields(&self) -> Vec<MetadataField> {
    self
      .fields
      .iter()
      .filter_map(|name| match name.parse::<MetadataField>() {
        Ok(field) => Some(field),
        Err(unknown) => {
          trace!("Ignoring unknown frontmatter field: {unknown}");
          None
        },
      })
      .collect()
  }

  /// The configured folder in normalized vault-relative form.
  pub fn folder(&self) -> String { vault::normalize_path(&self.folder) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_field_names_round_trip() {
    for field in MetadataField::ALL {
      assert_eq!(field.key().parse::<MetadataField>().unwrap(), field);
    }
    assert_eq!(" Title ".parse::<MetadataField>().unwrap(), MetadataField::Title);
    assert!("abstract".parse::<MetadataField>().is_err());
  }

  #[test]
  fn test_unknown_fields_are_skipped() {
    let settings = Settings {
      fields: vec!["doi".into(), "mystery".into(), "title".into()],
      ..Default::default()
    };
    assert_eq!(settings.selected_fields(), vec![MetadataField::Doi, MetadataField::Title]);
  }

  #[test]
  fn test_partial_settings_merge_over_defaults() {
    let settings: Settings =
      serde_json::from_str(r#"{"folder": "Library/Refs", "confirmDuplicates": false}"#).unwrap();
    assert_eq!(settings.folder, "Library/Refs");
    assert!(!settings.confirm_duplicates);
    assert_eq!(settings.filename_template, "{{title}}");
    assert_eq!(settings.fields.len(), MetadataField::ALL.len());
    assert!(settings.add_import_date);
  }

  #[test]
  fn test_folder_is_normalized() {
    let settings = Settings { folder: "/Papers//2024/".into(), ..Default::default() };
    assert_eq!(settings.folder(), "Papers/2024");
  }
}
