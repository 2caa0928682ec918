//! Data structures for Notably

use crate::clock::Clock;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Active notes keyed by page URL, in insertion order.
pub type NoteMap = IndexMap<String, Note>;

/// A note attached to a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub title: String,
    pub content: String,
    pub url: String,
    /// Epoch milliseconds of the last save
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
}

impl Note {
    pub fn is_starred(&self) -> bool {
        self.starred.unwrap_or(false)
    }

    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }
}

/// A note waiting in the trash
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrashedNote {
    pub note: Note,
    pub deleted_at: f64,
    pub original_url: String,
    /// Set from the trash write until the active copy is gone
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

/// Build a note from the editor fields, stamped with the current time.
///
/// Does not check that the note has a title or content, see [`is_savable`].
pub fn build(title: &str, content: &str, url: &str, tags: &[String], clock: &impl Clock) -> Note {
    Note {
        title: title.trim().to_string(),
        content: content.trim().to_string(),
        url: url.to_string(),
        timestamp: clock.now_ms(),
        tags: Some(
            tags.iter()
                .filter(|tag| !tag.trim().is_empty())
                .cloned()
                .collect(),
        ),
        starred: None,
    }
}

/// A note may be saved once its title or its content has something besides whitespace.
pub fn is_savable(title: &str, content: &str) -> bool {
    !title.trim().is_empty() || !content.trim().is_empty()
}

/// Split comma-separated tag text, dropping empty pieces.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

pub fn format_tags_for_input(tags: &[String]) -> String {
    tags.join(", ")
}
