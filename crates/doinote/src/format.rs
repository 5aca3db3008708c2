//! Text formatting utilities for filenames, tags and frontmatter scalars.
//!
//! # Examples
//!
//! ```
//! use doinote::format;
//!
//! assert_eq!(format::sanitize_filename("What is: a DOI?", None), "What is a DOI");
//! assert_eq!(format::format_tag("Computer Science  Applications"), "computer-science-applications");
//! assert_eq!(format::quote(r#"Say "hi""#), r#""Say \"hi\"""#);
//! ```

/// Longest filename (in characters, without extension) [`sanitize_filename`] produces by default.
pub const MAX_FILENAME_LENGTH: usize = 200;

/// Characters that are illegal in filenames on at least one common file system.
const ILLEGAL: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Makes a string safe to use as a filename.
///
/// This function performs several transformations:
/// - Removes `\ / : * ? " < > |` and control characters
/// - Collapses runs of whitespace into a single space and trims the ends
/// - Truncates to `max_length` characters (default [`MAX_FILENAME_LENGTH`])
///
/// # Examples
///
/// ```
/// use doinote::format::sanitize_filename;
///
/// assert_eq!(sanitize_filename("  No    Extra    Spaces ", None), "No Extra Spaces");
/// assert_eq!(sanitize_filename("a/b\\c", None), "abc");
/// assert_eq!(sanitize_filename("This Is A Long Title", Some(9)), "This Is A");
/// ```
pub fn sanitize_filename(name: &str, max_length: Option<usize>) -> String {
  let cleaned: String = name
    .chars()
    .filter(|c| !ILLEGAL.contains(c) && (c.is_whitespace() || !c.is_control()))
    .collect();
  let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

  let max_length = max_length.unwrap_or(MAX_FILENAME_LENGTH);
  if collapsed.chars().count() <= max_length {
    return collapsed;
  }
  collapsed.chars().take(max_length).collect::<String>().trim_end().to_string()
}

/// Turns a subject heading into a tag.
///
/// Tags are written as plain YAML scalars, so only letters, digits, `_` and `/` survive. Every
/// other run of characters becomes a single `-`, and none is left at either end.
pub fn format_tag(subject: &str) -> String {
  subject
    .to_lowercase()
    .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '/'))
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("-")
}

/// Wraps a value in double quotes for YAML, escaping backslashes, quotes and line breaks.
pub fn quote(value: &str) -> String {
  let mut quoted = String::with_capacity(value.len() + 2);
  quoted.push('"');
  for c in value.chars() {
    match c {
      '\\' => quoted.push_str("\\\\"),
      '"' => quoted.push_str("\\\""),
      '\n' => quoted.push_str("\\n"),
      '\r' => quoted.push_str("\\r"),
      '\t' => quoted.push_str("\\t"),
      c => quoted.push(c),
    }
  }
  quoted.push('"');
  quoted
}
