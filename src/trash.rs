//! Trash with bounded retention.
//!
//! The whole trash is a single map from URL to [`TrashedNote`], stored as
//! one value under [`TRASH_KEY`]. Every change rewrites that value.

use crate::clock::{Clock, DAY_MS};
use crate::error::StorageError;
use crate::keys::TRASH_KEY;
use crate::note::{Note, TrashedNote};
use crate::notes::{self, NoteRepository};
use crate::store::{Items, KeyValueStore};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::Value;

pub const RETENTION_DAYS: u32 = 30;
pub const MAX_ENTRIES: usize = 50;

/// Trashed notes keyed by their original URL
pub type TrashMap = IndexMap<String, TrashedNote>;

/// How long, and how many, trashed notes are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub retention_days: u32,
    pub max_entries: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy {
            retention_days: RETENTION_DAYS,
            max_entries: MAX_ENTRIES,
        }
    }
}

impl RetentionPolicy {
    fn retention_ms(&self) -> f64 {
        self.retention_days as f64 * DAY_MS
    }

    /// Drop expired entries, then keep only the `max_entries` most recently deleted.
    /// Returns the number of entries discarded.
    pub fn apply(&self, trash: &mut TrashMap, now: f64) -> usize {
        let before = trash.len();
        let retention = self.retention_ms();
        trash.retain(|_, item| now - item.deleted_at < retention);

        if trash.len() > self.max_entries {
            trash.sort_by(|_, a, _, b| b.deleted_at.total_cmp(&a.deleted_at));
            trash.truncate(self.max_entries);
        }

        before - trash.len()
    }

    /// Whole days left before an entry deleted at `deleted_at` expires, never negative.
    pub fn days_until_deletion(&self, deleted_at: f64, now: f64) -> u32 {
        let remaining = (self.retention_ms() - (now - deleted_at)) / DAY_MS;
        remaining.ceil().max(0.0) as u32
    }
}

fn decode_trash(value: Value) -> Result<TrashMap, StorageError> {
    serde_json::from_value(value).map_err(|source| StorageError::Corrupt {
        key: TRASH_KEY.to_string(),
        source,
    })
}

/// The trash partition, plus the moves between it and the active notes.
#[derive(Debug, Clone)]
pub struct TrashRepository<S, C> {
    store: S,
    clock: C,
    policy: RetentionPolicy,
}

impl<S, C> TrashRepository<S, C>
where
    S: KeyValueStore + Clone,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self::with_policy(store, clock, RetentionPolicy::default())
    }

    pub fn with_policy(store: S, clock: C, policy: RetentionPolicy) -> Self {
        TrashRepository {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    fn notes(&self) -> NoteRepository<S> {
        NoteRepository::new(self.store.clone())
    }

    /// The trash map as stored, without a retention pass.
    pub async fn load(&self) -> Result<TrashMap, StorageError> {
        match self.store.get(TRASH_KEY).await? {
            Some(value) => decode_trash(value),
            None => Ok(TrashMap::new()),
        }
    }

    async fn store_trash(&self, trash: &TrashMap) -> Result<(), StorageError> {
        let value = serde_json::to_value(trash).map_err(|source| StorageError::Corrupt {
            key: TRASH_KEY.to_string(),
            source,
        })?;
        let mut items = Items::new();
        items.insert(TRASH_KEY.to_string(), value);
        self.store.set(items).await
    }

    /// Move the note at `url` out of the active set and into the trash.
    ///
    /// The entry is written as pending, the active copy removed, then the
    /// entry settled. If the removal fails, [`reconcile`](Self::reconcile)
    /// finishes the move on the next read.
    pub async fn move_to_trash(&self, url: &str, note: Note) -> Result<(), StorageError> {
        let now = self.clock.now_ms();
        let mut trash = self.load().await?;
        trash.insert(
            url.to_string(),
            TrashedNote {
                note,
                deleted_at: now,
                original_url: url.to_string(),
                pending: true,
            },
        );
        let dropped = self.policy.apply(&mut trash, now);
        self.store_trash(&trash).await?;

        self.notes().delete(url).await?;

        if let Some(entry) = trash.get_mut(url) {
            entry.pending = false;
            self.store_trash(&trash).await?;
        }
        info!("moved {} to trash ({} expired)", url, dropped);
        Ok(())
    }

    /// Put a trashed note back, replacing any active note at the same URL.
    pub async fn restore(&self, url: &str) -> Result<Option<Note>, StorageError> {
        let mut trash = self.load().await?;
        let Some(trashed) = trash.shift_remove(url) else {
            return Ok(None);
        };

        self.notes().put(url, &trashed.note).await?;
        self.store_trash(&trash).await?;
        info!("restored {} from trash", url);
        Ok(Some(trashed.note))
    }

    pub async fn permanently_delete(&self, url: &str) -> Result<(), StorageError> {
        let mut trash = self.load().await?;
        if trash.shift_remove(url).is_some() {
            self.store_trash(&trash).await?;
            debug!("permanently deleted {}", url);
        }
        Ok(())
    }

    pub async fn empty_all(&self) -> Result<(), StorageError> {
        self.store_trash(&TrashMap::new()).await?;
        info!("emptied trash");
        Ok(())
    }

    /// Entries currently stored, with no retention pass first.
    pub async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.load().await?.len())
    }

    /// Apply the retention policy and persist the result. Returns the surviving trash.
    pub async fn cleanup(&self) -> Result<TrashMap, StorageError> {
        let mut trash = self.load().await?;
        let dropped = self.policy.apply(&mut trash, self.clock.now_ms());
        if dropped > 0 {
            self.store_trash(&trash).await?;
            info!("trash cleanup discarded {} entries", dropped);
        }
        Ok(trash)
    }

    /// Cleaned-up trash, most recently deleted first.
    pub async fn list(&self) -> Result<Vec<(String, TrashedNote)>, StorageError> {
        let mut entries: Vec<(String, TrashedNote)> = self.cleanup().await?.into_iter().collect();
        entries.sort_by(|a, b| b.1.deleted_at.total_cmp(&a.1.deleted_at));
        Ok(entries)
    }

    pub fn days_until_deletion(&self, deleted_at: f64) -> u32 {
        self.policy
            .days_until_deletion(deleted_at, self.clock.now_ms())
    }

    /// Finish moves to trash that stopped after the trash write.
    ///
    /// Only pending entries are looked at. The active copy is removed when it
    /// still matches the trashed snapshot; a note written there since is kept.
    /// Returns the number of active notes removed.
    pub async fn reconcile(&self) -> Result<usize, StorageError> {
        let mut items = self.store.get_all().await?;
        let Some(value) = items.shift_remove(TRASH_KEY) else {
            return Ok(0);
        };
        let mut trash = decode_trash(value)?;

        let mut removed = 0;
        let mut settled = 0;
        for (url, trashed) in trash.iter_mut().filter(|(_, trashed)| trashed.pending) {
            let leftover = match items.shift_remove(url.as_str()) {
                Some(value) => match notes::decode_note(url, value) {
                    Ok(active) => active == trashed.note,
                    Err(e) => {
                        warn!("leaving unreadable entry in place: {}", e);
                        false
                    }
                },
                None => false,
            };
            if leftover {
                self.store.remove(url).await?;
                removed += 1;
            }
            trashed.pending = false;
            settled += 1;
        }

        if settled > 0 {
            self.store_trash(&trash).await?;
            info!("settled {} pending trash entries, removed {} active copies", settled, removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::note::NoteMap;
    use crate::store::{MemoryStore, StoreOp};
    use futures::executor::block_on;

    const NOW: f64 = 1_760_000_000_000.0;

    fn create_test_note(url: &str, title: &str) -> Note {
        Note {
            title: title.to_string(),
            content: String::new(),
            url: url.to_string(),
            timestamp: NOW - DAY_MS,
            tags: Some(vec!["reading".to_string()]),
            starred: Some(true),
        }
    }

    fn trashed(url: &str, deleted_at: f64) -> TrashedNote {
        TrashedNote {
            note: create_test_note(url, url),
            deleted_at,
            original_url: url.to_string(),
            pending: false,
        }
    }

    fn setup<'a>(
        store: &'a MemoryStore,
        clock: &'a FixedClock,
    ) -> (
        NoteRepository<&'a MemoryStore>,
        TrashRepository<&'a MemoryStore, &'a FixedClock>,
    ) {
        (NoteRepository::new(store), TrashRepository::new(store, clock))
    }

    #[test]
    fn test_move_to_trash_then_restore() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (notes, trash) = setup(&store, &clock);
        let url = "https://example.com/a";
        let note = create_test_note(url, "A");
        block_on(notes.save(url, note.clone())).unwrap();

        block_on(trash.move_to_trash(url, note.clone())).unwrap();

        assert_eq!(block_on(notes.load(url)).unwrap(), None);
        let stored = block_on(trash.load()).unwrap();
        assert_eq!(stored[url].deleted_at, NOW);
        assert_eq!(stored[url].original_url, url);

        let restored = block_on(trash.restore(url)).unwrap();

        assert_eq!(restored, Some(note.clone()));
        assert_eq!(block_on(notes.load(url)).unwrap(), Some(note));
        assert_eq!(block_on(trash.count()).unwrap(), 0);
    }

    #[test]
    fn test_restore_overwrites_recreated_note() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (notes, trash) = setup(&store, &clock);
        let url = "https://example.com/a";
        let original = create_test_note(url, "Original");
        block_on(notes.save(url, original.clone())).unwrap();
        block_on(trash.move_to_trash(url, original.clone())).unwrap();

        block_on(notes.save(url, create_test_note(url, "Recreated"))).unwrap();
        block_on(trash.restore(url)).unwrap();

        assert_eq!(block_on(notes.load(url)).unwrap(), Some(original));
    }

    #[test]
    fn test_restore_missing_is_none() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (_, trash) = setup(&store, &clock);

        assert_eq!(block_on(trash.restore("https://missing.com")).unwrap(), None);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_permanently_delete_and_empty_all() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (_, trash) = setup(&store, &clock);
        for url in ["https://a.com", "https://b.com", "https://c.com"] {
            block_on(trash.move_to_trash(url, create_test_note(url, url))).unwrap();
        }

        block_on(trash.permanently_delete("https://b.com")).unwrap();
        block_on(trash.permanently_delete("https://b.com")).unwrap();
        let remaining = block_on(trash.load()).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(!remaining.contains_key("https://b.com"));

        block_on(trash.empty_all()).unwrap();
        assert_eq!(block_on(trash.count()).unwrap(), 0);
    }

    #[test]
    fn test_cleanup_drops_expired() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (_, trash) = setup(&store, &clock);
        let mut map = TrashMap::new();
        map.insert("https://old.com".to_string(), trashed("https://old.com", NOW - 31.0 * DAY_MS));
        map.insert("https://new.com".to_string(), trashed("https://new.com", NOW - DAY_MS));
        block_on(trash.store_trash(&map)).unwrap();

        let kept = block_on(trash.cleanup()).unwrap();

        assert_eq!(kept.len(), 1);
        assert!(kept.contains_key("https://new.com"));
        assert_eq!(block_on(trash.count()).unwrap(), 1);
    }

    #[test]
    fn test_cleanup_boundary_is_exclusive() {
        let policy = RetentionPolicy::default();
        let mut map = TrashMap::new();
        map.insert("https://edge.com".to_string(), trashed("https://edge.com", NOW - 30.0 * DAY_MS));
        map.insert("https://inside.com".to_string(), trashed("https://inside.com", NOW - 30.0 * DAY_MS + 1.0));

        let dropped = policy.apply(&mut map, NOW);

        assert_eq!(dropped, 1);
        assert!(map.contains_key("https://inside.com"));
    }

    #[test]
    fn test_cleanup_caps_entries() {
        let policy = RetentionPolicy::default();
        let mut map = TrashMap::new();
        for i in 0..51 {
            let url = format!("https://site{}.com", i);
            map.insert(url.clone(), trashed(&url, NOW - DAY_MS + i as f64));
        }

        let dropped = policy.apply(&mut map, NOW);

        assert_eq!(dropped, 1);
        assert_eq!(map.len(), MAX_ENTRIES);
        assert!(!map.contains_key("https://site0.com"));
        assert!(map.contains_key("https://site50.com"));
    }

    #[test]
    fn test_count_does_not_clean_up() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (_, trash) = setup(&store, &clock);
        let mut map = TrashMap::new();
        map.insert("https://old.com".to_string(), trashed("https://old.com", NOW - 40.0 * DAY_MS));
        block_on(trash.store_trash(&map)).unwrap();

        assert_eq!(block_on(trash.count()).unwrap(), 1);
        block_on(trash.cleanup()).unwrap();
        assert_eq!(block_on(trash.count()).unwrap(), 0);
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (_, trash) = setup(&store, &clock);
        block_on(trash.move_to_trash("https://first.com", create_test_note("https://first.com", "1"))).unwrap();
        clock.advance_days(1.0);
        block_on(trash.move_to_trash("https://second.com", create_test_note("https://second.com", "2"))).unwrap();

        let listed = block_on(trash.list()).unwrap();

        let urls: Vec<&str> = listed.iter().map(|(url, _)| url.as_str()).collect();
        assert_eq!(urls, vec!["https://second.com", "https://first.com"]);
    }

    #[test]
    fn test_move_to_trash_expires_old_entries() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (_, trash) = setup(&store, &clock);
        block_on(trash.move_to_trash("https://old.com", create_test_note("https://old.com", "old"))).unwrap();

        clock.advance_days(31.0);
        block_on(trash.move_to_trash("https://new.com", create_test_note("https://new.com", "new"))).unwrap();

        let stored = block_on(trash.load()).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored.contains_key("https://new.com"));
    }

    #[test]
    fn test_days_until_deletion() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (_, trash) = setup(&store, &clock);

        assert_eq!(trash.days_until_deletion(NOW), 30);
        assert_eq!(trash.days_until_deletion(NOW - 1.5 * DAY_MS), 29);
        assert_eq!(trash.days_until_deletion(NOW - 29.9 * DAY_MS), 1);
        assert_eq!(trash.days_until_deletion(NOW - 45.0 * DAY_MS), 0);
    }

    #[test]
    fn test_move_to_trash_settles_entry() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (notes, trash) = setup(&store, &clock);
        let url = "https://example.com/a";
        let note = create_test_note(url, "A");
        block_on(notes.save(url, note.clone())).unwrap();

        block_on(trash.move_to_trash(url, note)).unwrap();

        assert!(!block_on(trash.load()).unwrap()[url].pending);
        assert!(store.snapshot()[TRASH_KEY][url].get("pending").is_none());
    }

    #[test]
    fn test_interrupted_move_is_reconciled() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (notes, trash) = setup(&store, &clock);
        let url = "https://example.com/a";
        let note = create_test_note(url, "A");
        block_on(notes.save(url, note.clone())).unwrap();

        store.fail_next(StoreOp::Remove);
        assert!(block_on(trash.move_to_trash(url, note)).is_err());
        assert!(block_on(notes.load(url)).unwrap().is_some());
        assert!(block_on(trash.load()).unwrap()[url].pending);

        assert_eq!(block_on(trash.reconcile()).unwrap(), 1);
        assert_eq!(block_on(notes.load(url)).unwrap(), None);
        let stored = block_on(trash.load()).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[url].pending);

        assert_eq!(block_on(trash.reconcile()).unwrap(), 0);
    }

    #[test]
    fn test_reconcile_ignores_settled_entries() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (notes, trash) = setup(&store, &clock);
        let url = "https://example.com/a";
        let note = create_test_note(url, "A");
        block_on(notes.save(url, note.clone())).unwrap();
        block_on(trash.move_to_trash(url, note.clone())).unwrap();

        // The same note written back, as an import of an older export would
        let mut written = NoteMap::new();
        written.insert(url.to_string(), note.clone());
        block_on(notes.import_batch(&written)).unwrap();
        let writes = store.set_calls();

        assert_eq!(block_on(trash.reconcile()).unwrap(), 0);
        assert_eq!(block_on(notes.load(url)).unwrap(), Some(note));
        assert_eq!(store.set_calls(), writes);
    }

    #[test]
    fn test_reconcile_reads_store_once() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (_, trash) = setup(&store, &clock);
        let mut map = TrashMap::new();
        for i in 0..3 {
            let url = format!("https://site{}.com", i);
            let mut entry = trashed(&url, NOW);
            entry.pending = true;
            map.insert(url, entry);
        }
        block_on(trash.store_trash(&map)).unwrap();

        store.fail_next(StoreOp::Get);
        assert_eq!(block_on(trash.reconcile()).unwrap(), 0);

        assert!(block_on(trash.load()).is_err());
        assert!(block_on(trash.load()).unwrap().values().all(|entry| !entry.pending));
    }

    #[test]
    fn test_reconcile_keeps_recreated_note() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (notes, trash) = setup(&store, &clock);
        let url = "https://example.com/a";
        block_on(trash.move_to_trash(url, create_test_note(url, "Old"))).unwrap();
        block_on(notes.save(url, create_test_note(url, "New"))).unwrap();

        assert_eq!(block_on(trash.reconcile()).unwrap(), 0);
        assert_eq!(block_on(notes.load(url)).unwrap().unwrap().title, "New");
    }

    #[test]
    fn test_failed_trash_write_leaves_note_active() {
        let store = MemoryStore::new();
        let clock = FixedClock::new(NOW);
        let (notes, trash) = setup(&store, &clock);
        let url = "https://example.com/a";
        let note = create_test_note(url, "A");
        block_on(notes.save(url, note.clone())).unwrap();

        store.fail_next(StoreOp::Set);
        assert!(block_on(trash.move_to_trash(url, note.clone())).is_err());

        assert_eq!(block_on(notes.load(url)).unwrap(), Some(note));
        assert_eq!(block_on(trash.count()).unwrap(), 0);
    }
}
