//! Active notes, one per page URL

use crate::error::StorageError;
use crate::keys::{self, StorageKey};
use crate::note::{Note, NoteMap};
use crate::store::{Items, KeyValueStore};
use log::{debug, warn};
use serde_json::Value;

/// CRUD over the notes partition of a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct NoteRepository<S> {
    store: S,
}

pub(crate) fn decode_note(url: &str, value: Value) -> Result<Note, StorageError> {
    serde_json::from_value(value).map_err(|source| StorageError::Corrupt {
        key: url.to_string(),
        source,
    })
}

pub(crate) fn encode_note(url: &str, note: &Note) -> Result<Value, StorageError> {
    serde_json::to_value(note).map_err(|source| StorageError::Corrupt {
        key: url.to_string(),
        source,
    })
}

impl<S: KeyValueStore> NoteRepository<S> {
    pub fn new(store: S) -> Self {
        NoteRepository { store }
    }

    /// Upsert the note at `url`. A star on the stored note survives unless `note` sets one.
    ///
    /// Fails with [`StorageError::ReservedKey`] for the trash key.
    pub async fn save(&self, url: &str, mut note: Note) -> Result<Note, StorageError> {
        if note.starred.is_none() {
            if let Some(existing) = self.load(url).await? {
                note.starred = existing.starred;
            }
        }
        self.put(url, &note).await?;
        debug!("saved note for {}", url);
        Ok(note)
    }

    /// Write the note exactly as given, replacing whatever is stored.
    pub(crate) async fn put(&self, url: &str, note: &Note) -> Result<(), StorageError> {
        if StorageKey::classify(url) == StorageKey::Trash {
            return Err(StorageError::ReservedKey {
                key: url.to_string(),
            });
        }
        let mut items = Items::new();
        items.insert(url.to_string(), encode_note(url, note)?);
        self.store.set(items).await
    }

    pub async fn load(&self, url: &str) -> Result<Option<Note>, StorageError> {
        if StorageKey::classify(url) == StorageKey::Trash {
            return Ok(None);
        }
        match self.store.get(url).await? {
            Some(value) => decode_note(url, value).map(Some),
            None => Ok(None),
        }
    }

    /// Every active note. Values that are not notes are skipped.
    pub async fn load_all(&self) -> Result<NoteMap, StorageError> {
        let items = self.store.get_all().await?;
        let mut notes = NoteMap::with_capacity(items.len());

        for (url, value) in keys::note_entries(items) {
            match decode_note(&url, value) {
                Ok(note) => {
                    notes.insert(url, note);
                }
                Err(e) => warn!("skipping unreadable entry: {}", e),
            }
        }

        Ok(notes)
    }

    /// Remove the note at `url` without going through the trash.
    pub async fn delete(&self, url: &str) -> Result<(), StorageError> {
        if StorageKey::classify(url) == StorageKey::Trash {
            return Ok(());
        }
        self.store.remove(url).await?;
        debug!("deleted note for {}", url);
        Ok(())
    }

    /// Flip the star on the note at `url`, returning the updated note. No-op if absent.
    pub async fn toggle_star(&self, url: &str) -> Result<Option<Note>, StorageError> {
        let Some(mut note) = self.load(url).await? else {
            return Ok(None);
        };
        note.starred = Some(!note.is_starred());
        self.put(url, &note).await?;
        Ok(Some(note))
    }

    /// Write every note in one store call. The trash key is not a note and is skipped.
    pub async fn import_batch(&self, notes: &NoteMap) -> Result<usize, StorageError> {
        let mut items = Items::with_capacity(notes.len());
        for (url, note) in keys::note_entries(notes) {
            items.insert(url.to_string(), encode_note(url, note)?);
        }

        let count = items.len();
        if count > 0 {
            self.store.set(items).await?;
        }
        debug!("imported {} notes", count);
        Ok(count)
    }
}
