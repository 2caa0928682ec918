//! Partitions of the flat storage namespace.
//!
//! Notes live under their page URL; the trash is one reserved key. Every
//! listing, export and import decides what a key means through [`StorageKey::classify`].

/// The reserved key holding the whole trash map
pub const TRASH_KEY: &str = "notably_trash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey<'a> {
    Note(&'a str),
    Trash,
}

impl<'a> StorageKey<'a> {
    pub fn classify(key: &'a str) -> StorageKey<'a> {
        if key == TRASH_KEY {
            StorageKey::Trash
        } else {
            StorageKey::Note(key)
        }
    }

    pub fn as_str(self) -> &'a str {
        match self {
            StorageKey::Note(url) => url,
            StorageKey::Trash => TRASH_KEY,
        }
    }
}

/// Yield only the entries that belong to the notes partition.
pub fn note_entries<K, V, I>(entries: I) -> impl Iterator<Item = (K, V)>
where
    K: AsRef<str>,
    I: IntoIterator<Item = (K, V)>,
{
    entries
        .into_iter()
        .filter(|(key, _)| StorageKey::classify(key.as_ref()) != StorageKey::Trash)
}
