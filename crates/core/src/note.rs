//! Persisted annotation records.
//!
//! Annotations are stored per page URL under `note_<url>`. Older records are
//! a bare string; newer ones are an object carrying the page title and
//! favicon captured when the note was written.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key prefix for annotation records.
pub const NOTE_KEY_PREFIX: &str = "note_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("annotation text is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        rename = "favIconUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub favicon_url: Option<String>,
    /// Epoch milliseconds.
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteRecord {
    Legacy(String),
    Entry(NoteEntry),
}

impl NoteRecord {
    /// New record stamped with the current time.
    pub fn new(
        content: &str,
        title: Option<String>,
        favicon_url: Option<String>,
    ) -> Result<Self, NoteError> {
        if content.trim().is_empty() {
            return Err(NoteError::Empty);
        }
        Ok(Self::Entry(NoteEntry {
            content: content.to_string(),
            title,
            favicon_url,
            updated_at: Some(Utc::now().timestamp_millis()),
        }))
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Legacy(text) => text,
            Self::Entry(entry) => &entry.content,
        }
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Legacy(_) => None,
            Self::Entry(entry) => entry
                .updated_at
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        }
    }
}

/// Storage key for the note attached to `url`.
pub fn note_key(url: &str) -> String {
    format!("{NOTE_KEY_PREFIX}{url}")
}

/// Inverse of [`note_key`]; `None` for keys that are not notes.
pub fn url_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(NOTE_KEY_PREFIX).filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_legacy_and_entry_shapes() {
        let legacy: NoteRecord = serde_json::from_str(r#""remember me""#).unwrap();
        assert_eq!(legacy.content(), "remember me");
        assert!(legacy.updated_at().is_none());

        let entry: NoteRecord = serde_json::from_str(
            r#"{"content":"todo","title":"Page","favIconUrl":"https://a.test/f.ico","updatedAt":1700000000000}"#,
        )
        .unwrap();
        assert_eq!(entry.content(), "todo");
        assert_eq!(
            entry.updated_at().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_new_rejects_blank_text() {
        assert_eq!(NoteRecord::new("  ", None, None), Err(NoteError::Empty));
        let record = NoteRecord::new("keep", Some("Page".into()), None).unwrap();
        assert!(record.updated_at().is_some());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["content"], "keep");
        assert!(json.get("favIconUrl").is_none());
    }

    #[test]
    fn test_note_keys() {
        assert_eq!(note_key("https://a.test/"), "note_https://a.test/");
        assert_eq!(url_from_key("note_https://a.test/"), Some("https://a.test/"));
        assert_eq!(url_from_key("noteShortcut"), None);
        assert_eq!(url_from_key("note_"), None);
    }
}
