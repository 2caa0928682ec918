//! Domain extraction and grouping logic for Notably

use crate::note::{Note, NoteMap};
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

/// Bucket for URLs with no usable hostname
pub const UNKNOWN_DOMAIN: &str = "Unknown";

/// Notes that share a domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainGroup {
    pub domain: String,
    pub notes: Vec<Note>,
}

/// Hostname of a URL, or the input itself if it does not parse
///
/// Examples:
/// - https://www.google.com/search → www.google.com
/// - not a url → not a url
pub fn hostname(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(String::from))
        .unwrap_or_else(|| url.to_string())
}

/// Grouping key for a URL: hostname without a leading "www."
///
/// Examples:
/// - https://www.example.com/y → example.com
/// - https://a.example.com/x → a.example.com
/// - about:blank → Unknown
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .host_str()
                .filter(|host| !host.is_empty())
                .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
        })
        .unwrap_or_else(|| UNKNOWN_DOMAIN.to_string())
}

/// Group notes by domain, domains in ascending order.
///
/// Each note is stamped with the URL it is stored under. Within a group,
/// notes keep the order of `notes`.
pub fn group_by_domain(notes: &NoteMap) -> Vec<DomainGroup> {
    let mut groups: HashMap<String, Vec<Note>> = HashMap::new();
    for (url, note) in notes {
        let mut note = note.clone();
        note.url = url.clone();
        groups
            .entry(extract_domain(url))
            .or_insert_with(Vec::new)
            .push(note);
    }

    let mut groups: Vec<DomainGroup> = groups
        .into_iter()
        .map(|(domain, notes)| DomainGroup { domain, notes })
        .collect();
    groups.sort_by(|a, b| a.domain.cmp(&b.domain));
    groups
}
