//! Record domain model.
//!
//! # Responsibility
//! - Define the editable unit mirrored from the remote store.
//! - Provide path helpers used by container (folder) cascades.
//!
//! # Invariants
//! - `id` is stable and unique within one collection.
//! - `name` is a normalized slash-separated path (see [`normalize_record_name`]).
//! - Folder records never carry content.
//!
//! # See also
//! - DESIGN.md

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static REPEATED_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/{2,}").expect("valid separator regex"));
static FORBIDDEN_NAME_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\x00-\x1f\\:*?"<>|]"#).expect("valid forbidden-char regex"));

const MAX_NAME_CHARS: usize = 255;

/// Stable record identifier as issued by the remote store.
pub type RecordId = String;

/// Parent context identifier (e.g. one project).
pub type ContextId = String;

/// Attribute key holding the classifier output for file records.
pub const LANGUAGE_ATTRIBUTE: &str = "language";

/// Record category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Editable content unit.
    File,
    /// Container whose descendants share its name as a path prefix.
    Folder,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "file" => Some(Self::File),
            "folder" => Some(Self::Folder),
            _ => None,
        }
    }
}

/// Scalar attribute value attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Attribute map; ordered for deterministic serialization.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// One named, editable unit of content within a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub context_id: ContextId,
    /// Normalized path, e.g. `src/main.rs`.
    pub name: String,
    pub kind: RecordKind,
    pub content: String,
    pub attributes: Attributes,
    /// Number of remote updates applied since insert.
    pub revision: i64,
    /// Epoch milliseconds of the last remote-confirmed change.
    pub updated_at: i64,
}

impl Record {
    pub fn is_folder(&self) -> bool {
        self.kind == RecordKind::Folder
    }

    /// Returns whether `other` is nested anywhere under this record's path.
    pub fn contains(&self, other: &Record) -> bool {
        self.is_folder() && is_descendant_name(&self.name, &other.name)
    }

    /// Returns the classifier tag stored on this record, if any.
    pub fn language(&self) -> Option<&str> {
        match self.attributes.get(LANGUAGE_ATTRIBUTE) {
            Some(AttributeValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Insert payload for a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub name: String,
    pub kind: RecordKind,
    pub content: String,
    pub attributes: Attributes,
}

/// Partial update payload. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub content: Option<String>,
    pub attributes: Option<Attributes>,
}

impl RecordPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// Rejection reasons for record names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    Empty,
    TooLong { max_chars: usize },
    ForbiddenCharacter(String),
    RelativeSegment(String),
}

impl Display for NameValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "record name must not be blank"),
            Self::TooLong { max_chars } => {
                write!(f, "record name exceeds {max_chars} characters")
            }
            Self::ForbiddenCharacter(name) => {
                write!(f, "record name contains a forbidden character: `{name}`")
            }
            Self::RelativeSegment(name) => {
                write!(f, "record name must not contain `.` or `..` segments: `{name}`")
            }
        }
    }
}

impl Error for NameValidationError {}

/// Normalizes one record name into canonical path form.
///
/// Rules:
/// - surrounding whitespace and leading/trailing `/` are removed;
/// - repeated separators collapse to one `/`;
/// - control characters, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|` are rejected;
/// - `.` and `..` segments are rejected.
pub fn normalize_record_name(value: &str) -> Result<String, NameValidationError> {
    let collapsed = REPEATED_SEPARATOR_RE.replace_all(value.trim(), "/");
    let trimmed = collapsed.trim_matches('/');
    if trimmed.is_empty() {
        return Err(NameValidationError::Empty);
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(NameValidationError::TooLong {
            max_chars: MAX_NAME_CHARS,
        });
    }
    if FORBIDDEN_NAME_CHARS_RE.is_match(trimmed) {
        return Err(NameValidationError::ForbiddenCharacter(trimmed.to_string()));
    }
    if trimmed
        .split('/')
        .any(|segment| segment == "." || segment == ".." || segment.trim().is_empty())
    {
        return Err(NameValidationError::RelativeSegment(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Returns whether `candidate` is nested under `container` by path prefix.
pub fn is_descendant_name(container: &str, candidate: &str) -> bool {
    candidate.len() > container.len() + 1
        && candidate.starts_with(container)
        && candidate.as_bytes()[container.len()] == b'/'
}

/// Rewrites the `old_prefix` path prefix of `name` to `new_prefix`.
///
/// Returns `None` when `name` is not nested under `old_prefix`.
pub fn rebase_name(name: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_descendant_name(old_prefix, name) {
        return None;
    }
    Some(format!("{new_prefix}{}", &name[old_prefix.len()..]))
}

#[cfg(test)]
mod tests {
    use super::{is_descendant_name, normalize_record_name, rebase_name, NameValidationError};

    #[test]
    fn normalize_collapses_separators_and_trims() {
        assert_eq!(
            normalize_record_name("  /src//lib///mod.rs/ ").unwrap(),
            "src/lib/mod.rs"
        );
    }

    #[test]
    fn normalize_rejects_blank_and_relative_segments() {
        assert_eq!(
            normalize_record_name(" // ").unwrap_err(),
            NameValidationError::Empty
        );
        assert!(matches!(
            normalize_record_name("src/../etc").unwrap_err(),
            NameValidationError::RelativeSegment(_)
        ));
        assert!(matches!(
            normalize_record_name("a:b.txt").unwrap_err(),
            NameValidationError::ForbiddenCharacter(_)
        ));
    }

    #[test]
    fn descendant_check_requires_separator_boundary() {
        assert!(is_descendant_name("src", "src/main.rs"));
        assert!(is_descendant_name("src", "src/a/b.rs"));
        assert!(!is_descendant_name("src", "src"));
        assert!(!is_descendant_name("src", "srcfoo/main.rs"));
    }

    #[test]
    fn rebase_rewrites_prefix_only_for_descendants() {
        assert_eq!(
            rebase_name("src/a/b.rs", "src", "lib").as_deref(),
            Some("lib/a/b.rs")
        );
        assert_eq!(rebase_name("docs/a.md", "src", "lib"), None);
    }
}
