use crate::Note;

/// Notes whose title or content contains `query`, ignoring case.
/// An empty (or whitespace-only) query matches everything.
pub fn search_notes<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    let needle = query.trim().to_lowercase();
    notes
        .iter()
        .filter(|n| matches(n, &needle))
        .collect()
}

/// Like [`search_notes`], restricted to `category_id` when one is selected.
pub fn filter_notes<'a>(notes: &'a [Note], category_id: Option<&str>, query: &str) -> Vec<&'a Note> {
    let needle = query.trim().to_lowercase();
    notes
        .iter()
        .filter(|n| category_id.map_or(true, |c| n.category_id.as_deref() == Some(c)))
        .filter(|n| matches(n, &needle))
        .collect()
}

fn matches(note: &Note, needle: &str) -> bool {
    needle.is_empty()
        || note.title.to_lowercase().contains(needle)
        || note.content.to_lowercase().contains(needle)
}
