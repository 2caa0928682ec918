//! Note search

use crate::note::{Note, NoteMap};
use std::borrow::Cow;

fn note_matches(note: &Note, query: &str) -> bool {
    note.title.to_lowercase().contains(query)
        || note.content.to_lowercase().contains(query)
        || note.tags().iter().any(|tag| tag.to_lowercase().contains(query))
}

/// Notes whose title, content or any tag contains `query`, ignoring case.
///
/// A blank query borrows `notes` back unchanged.
pub fn search<'a>(notes: &'a NoteMap, query: &str) -> Cow<'a, NoteMap> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Cow::Borrowed(notes);
    }

    Cow::Owned(
        notes
            .iter()
            .filter(|(_, note)| note_matches(note, &query))
            .map(|(url, note)| (url.clone(), note.clone()))
            .collect(),
    )
}
