//! Tag editing rules: tags are stored trimmed, lower-cased and unique.

pub fn normalize_tag(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Append a tag unless it is blank or already present. Returns whether the list changed.
pub fn add_tag(tags: &mut Vec<String>, raw: &str) -> bool {
    let tag = normalize_tag(raw);
    if tag.is_empty() || tags.contains(&tag) {
        return false;
    }
    tags.push(tag);
    true
}

pub fn remove_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let original_len = tags.len();
    tags.retain(|t| t != tag);
    tags.len() < original_len
}
