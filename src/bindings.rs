//! Functions exported to the extension popup.
//!
//! Every call builds its repositories over `chrome.storage.sync` and hands
//! back plain JS data. Failures reject the returned promise with a message.
//! Calls that read or write active notes first finish any interrupted move to trash.

use crate::clock::{Clock, SystemClock};
use crate::domain;
use crate::error::Error;
use crate::note::{self, NoteMap, TrashedNote};
use crate::notes::NoteRepository;
use crate::search;
use crate::store::BrowserStore;
use crate::tags;
use crate::transfer;
use crate::trash::TrashRepository;
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn notes() -> NoteRepository<BrowserStore> {
    NoteRepository::new(BrowserStore::default())
}

fn trash() -> TrashRepository<BrowserStore, SystemClock> {
    TrashRepository::new(BrowserStore::default(), SystemClock)
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize: {}", e)))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse: {}", e)))
}

fn js_err(error: impl Into<Error>) -> JsValue {
    JsValue::from_str(&error.into().to_string())
}

/// Save the editor contents for `url`. Resolves to the saved note, or null when
/// both title and content are blank.
#[wasm_bindgen(js_name = saveNote)]
pub async fn save_note(
    url: String,
    title: String,
    content: String,
    tags: Vec<String>,
) -> Result<JsValue, JsValue> {
    if url.is_empty() || !note::is_savable(&title, &content) {
        return Ok(JsValue::NULL);
    }
    trash().reconcile().await.map_err(js_err)?;
    let note = note::build(&title, &content, &url, &tags, &SystemClock);
    let saved = notes().save(&url, note).await.map_err(js_err)?;
    to_js(&saved)
}

#[wasm_bindgen(js_name = loadNote)]
pub async fn load_note(url: String) -> Result<JsValue, JsValue> {
    trash().reconcile().await.map_err(js_err)?;
    match notes().load(&url).await.map_err(js_err)? {
        Some(note) => to_js(&note),
        None => Ok(JsValue::NULL),
    }
}

#[wasm_bindgen(js_name = loadAllNotes)]
pub async fn load_all_notes() -> Result<JsValue, JsValue> {
    trash().reconcile().await.map_err(js_err)?;
    let all = notes().load_all().await.map_err(js_err)?;
    to_js(&all)
}

/// Delete immediately, skipping the trash.
#[wasm_bindgen(js_name = deleteNote)]
pub async fn delete_note(url: String) -> Result<(), JsValue> {
    notes().delete(&url).await.map_err(js_err)
}

#[wasm_bindgen(js_name = toggleStar)]
pub async fn toggle_star(url: String) -> Result<JsValue, JsValue> {
    trash().reconcile().await.map_err(js_err)?;
    match notes().toggle_star(&url).await.map_err(js_err)? {
        Some(note) => to_js(&note),
        None => Ok(JsValue::NULL),
    }
}

/// Resolves to false when there is no note at `url`.
#[wasm_bindgen(js_name = moveToTrash)]
pub async fn move_to_trash(url: String) -> Result<bool, JsValue> {
    let Some(note) = notes().load(&url).await.map_err(js_err)? else {
        return Ok(false);
    };
    trash().move_to_trash(&url, note).await.map_err(js_err)?;
    Ok(true)
}

#[wasm_bindgen(js_name = restoreNote)]
pub async fn restore_note(url: String) -> Result<JsValue, JsValue> {
    match trash().restore(&url).await.map_err(js_err)? {
        Some(note) => to_js(&note),
        None => Ok(JsValue::NULL),
    }
}

#[wasm_bindgen(js_name = permanentlyDelete)]
pub async fn permanently_delete(url: String) -> Result<(), JsValue> {
    trash().permanently_delete(&url).await.map_err(js_err)
}

#[wasm_bindgen(js_name = emptyTrash)]
pub async fn empty_trash() -> Result<(), JsValue> {
    trash().empty_all().await.map_err(js_err)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrashEntry {
    url: String,
    trashed_note: TrashedNote,
    days_remaining: u32,
}

/// Trash after a retention pass, most recently deleted first.
#[wasm_bindgen(js_name = listTrash)]
pub async fn list_trash() -> Result<JsValue, JsValue> {
    let trash = trash();
    let entries: Vec<TrashEntry> = trash
        .list()
        .await
        .map_err(js_err)?
        .into_iter()
        .map(|(url, trashed_note)| TrashEntry {
            days_remaining: trash.days_until_deletion(trashed_note.deleted_at),
            url,
            trashed_note,
        })
        .collect();
    to_js(&entries)
}

#[wasm_bindgen(js_name = trashCount)]
pub async fn trash_count() -> Result<usize, JsValue> {
    let trash = trash();
    trash.cleanup().await.map_err(js_err)?;
    trash.count().await.map_err(js_err)
}

/// Resolves to `{ filename, contents }` for the popup to download.
#[wasm_bindgen(js_name = exportNotes)]
pub async fn export_notes() -> Result<JsValue, JsValue> {
    let doc = transfer::export(&notes(), SystemClock.now_ms())
        .await
        .map_err(js_err)?;
    to_js(&doc)
}

/// Validate the whole file, then write it. Resolves to the number of notes imported.
#[wasm_bindgen(js_name = importNotes)]
pub async fn import_notes(bytes: Vec<u8>) -> Result<usize, JsValue> {
    let validated = transfer::validate_import(&bytes).map_err(js_err)?;
    trash().reconcile().await.map_err(js_err)?;
    transfer::commit_import(&notes(), &validated)
        .await
        .map_err(js_err)
}

#[wasm_bindgen(js_name = searchNotes)]
pub fn search_notes(notes: JsValue, query: &str) -> Result<JsValue, JsValue> {
    let notes: NoteMap = from_js(notes)?;
    to_js(&*search::search(&notes, query))
}

#[wasm_bindgen(js_name = groupByDomain)]
pub fn group_by_domain(notes: JsValue) -> Result<JsValue, JsValue> {
    let notes: NoteMap = from_js(notes)?;
    to_js(&domain::group_by_domain(&notes))
}

#[wasm_bindgen(js_name = parseTags)]
pub fn parse_tags(tags: &str) -> Vec<String> {
    note::parse_tags(tags)
}

#[wasm_bindgen(js_name = formatTagsForInput)]
pub fn format_tags_for_input(tags: Vec<String>) -> String {
    note::format_tags_for_input(&tags)
}

/// Add a tag typed into the tag input, returning the new list.
#[wasm_bindgen(js_name = addTag)]
pub fn add_tag(tags: Vec<String>, raw: &str) -> Vec<String> {
    let mut tags = tags;
    tags::add_tag(&mut tags, raw);
    tags
}

#[wasm_bindgen(js_name = removeTag)]
pub fn remove_tag(tags: Vec<String>, tag: &str) -> Vec<String> {
    let mut tags = tags;
    tags::remove_tag(&mut tags, tag);
    tags
}

#[wasm_bindgen(js_name = hostname)]
pub fn hostname(url: &str) -> String {
    domain::hostname(url)
}
