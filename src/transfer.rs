//! Export and import of the active notes as a JSON document.
//!
//! The document is the same shape as the store: an object mapping each page
//! URL to its note. Imports are validated in full before anything is written.

use crate::error::{Error, ImportError, StorageError};
use crate::keys::{StorageKey, TRASH_KEY};
use crate::note::{Note, NoteMap};
use crate::notes::NoteRepository;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

/// A ready-to-download export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub filename: String,
    pub contents: String,
}

/// `notably-export-YYYY-MM-DD.json`, using the UTC date of `now_ms`.
pub fn export_filename(now_ms: f64) -> String {
    let date = DateTime::<Utc>::from_timestamp_millis(now_ms as i64)
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown-date".to_string());
    format!("notably-export-{}.json", date)
}

/// Serialize every active note, pretty-printed with 2-space indentation.
pub async fn export<S: KeyValueStore>(
    notes: &NoteRepository<S>,
    now_ms: f64,
) -> Result<ExportDocument, Error> {
    let all = notes.load_all().await?;
    let contents = serde_json::to_string_pretty(&all)?;
    info!("exported {} notes", all.len());

    Ok(ExportDocument {
        filename: export_filename(now_ms),
        contents,
    })
}

fn is_valid_note(value: &Value) -> bool {
    let Some(fields) = value.as_object() else {
        return false;
    };

    fields.get("title").is_some_and(Value::is_string)
        && fields.get("content").is_some_and(Value::is_string)
        && fields.get("url").is_some_and(Value::is_string)
        && fields.get("timestamp").is_some_and(Value::is_number)
        && fields.get("tags").is_none_or(Value::is_array)
}

/// Parse and check an import file. Fails on the first malformed entry.
pub fn validate_import(raw: &[u8]) -> Result<NoteMap, ImportError> {
    // Well-formed JSON of the wrong shape fails as a data error
    let entries: IndexMap<String, Value> = serde_json::from_slice(raw).map_err(|e| {
        if e.is_data() {
            ImportError::NotAnObject
        } else {
            ImportError::InvalidJson
        }
    })?;
    if entries.is_empty() {
        return Err(ImportError::Empty);
    }

    let mut notes = NoteMap::with_capacity(entries.len());
    for (url, value) in entries {
        if StorageKey::classify(&url) == StorageKey::Trash {
            warn!("ignoring {} entry in import", TRASH_KEY);
            continue;
        }
        if !is_valid_note(&value) {
            return Err(ImportError::InvalidNote { url });
        }
        match serde_json::from_value::<Note>(value) {
            Ok(note) => {
                notes.insert(url, note);
            }
            Err(_) => return Err(ImportError::InvalidNote { url }),
        }
    }

    if notes.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(notes)
}

/// Write validated notes over the active set in one batch.
pub async fn commit_import<S: KeyValueStore>(
    notes: &NoteRepository<S>,
    validated: &NoteMap,
) -> Result<usize, StorageError> {
    let count = notes.import_batch(validated).await?;
    info!("imported {} notes", count);
    Ok(count)
}
