//! Tags and their note links, mirrored to the storage backend.

use std::sync::Arc;

use chrono::Utc;

use crate::core::store::{Collection, Snapshot};
use crate::{NewTag, NoteTag, Result, StorageBackend, Tag, TagPatch};

/// Handle to the tag and note-tag collections. Clones share the same state.
#[derive(Clone)]
pub struct TagStore {
    tags: Arc<Collection<Tag>>,
    links: Arc<Collection<NoteTag>>,
    backend: Arc<dyn StorageBackend>,
}

impl TagStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            tags: Arc::new(Collection::new()),
            links: Arc::new(Collection::new()),
            backend,
        }
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.tags.items()
    }

    pub fn note_tags(&self) -> Vec<NoteTag> {
        self.links.items()
    }

    pub fn get(&self, id: &str) -> Option<Tag> {
        self.tags.find(|t| t.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.tags.is_loading() || self.links.is_loading()
    }

    /// The most recent failure of either collection.
    pub fn error(&self) -> Option<String> {
        self.links.error().or_else(|| self.tags.error())
    }

    pub fn clear_error(&self) {
        self.tags.clear_error();
        self.links.clear_error();
    }

    /// Replaces both collections without touching the backend.
    pub fn init(&self, tags: Vec<Tag>, note_tags: Vec<NoteTag>) {
        self.tags.init(tags);
        self.links.init(note_tags);
    }

    pub fn load(&self) -> bool {
        let backend = Arc::clone(&self.backend);
        let tags_ok = self
            .tags
            .load("Failed to load tags", || backend.get_all_tags());
        let links_ok = self
            .links
            .load("Failed to load note tags", || backend.get_all_note_tags());
        tags_ok && links_ok
    }

    pub fn add_tag(&self, data: NewTag) -> String {
        let tag = Tag::new(data, Utc::now());
        let id = tag.id.clone();
        let ((), snapshot) = self.tags.mutate(|items| items.push(tag));
        self.save_tags(&snapshot, "Failed to save new tag");
        id
    }

    pub fn update_tag(&self, id: &str, patch: TagPatch) -> bool {
        let now = Utc::now();
        let (found, snapshot) = self.tags.mutate(|items| {
            match items.iter_mut().find(|t| t.id == id) {
                Some(tag) => {
                    tag.apply(patch, now);
                    true
                }
                None => false,
            }
        });
        if found {
            self.save_tags(&snapshot, "Failed to save updated tag");
        }
        found
    }

    /// Removes tag `id` together with every link that points at it.
    pub fn delete_tag(&self, id: &str) -> bool {
        let (removed, tag_snapshot) = self.tags.mutate(|items| {
            let before = items.len();
            items.retain(|t| t.id != id);
            items.len() != before
        });
        if !removed {
            return false;
        }
        let ((), link_snapshot) = self.links.mutate(|items| items.retain(|l| l.tag_id != id));
        self.save_tags(&tag_snapshot, "Failed to save tags after delete");
        self.save_links(&link_snapshot, "Failed to save note tags after delete");
        true
    }

    /// Links `tag_id` to `note_id`. Adding an existing link changes nothing.
    pub fn add_note_tag(&self, note_id: &str, tag_id: &str) {
        let link = NoteTag::new(note_id, tag_id);
        let (added, snapshot) = self.links.mutate(|items| {
            if items.contains(&link) {
                false
            } else {
                items.push(link);
                true
            }
        });
        if added {
            self.save_links(&snapshot, "Failed to save new note tag");
        }
    }

    pub fn remove_note_tag(&self, note_id: &str, tag_id: &str) {
        let (removed, snapshot) = self.links.mutate(|items| {
            let before = items.len();
            items.retain(|l| !(l.note_id == note_id && l.tag_id == tag_id));
            items.len() != before
        });
        if removed {
            self.save_links(&snapshot, "Failed to save note tags after removal");
        }
    }

    /// Tags linked to `note_id`, in tag collection order.
    pub fn get_note_tags(&self, note_id: &str) -> Vec<Tag> {
        let linked: Vec<String> = self
            .links
            .lock()
            .items
            .iter()
            .filter(|l| l.note_id == note_id)
            .map(|l| l.tag_id.clone())
            .collect();
        self.tags
            .lock()
            .items
            .iter()
            .filter(|t| linked.contains(&t.id))
            .cloned()
            .collect()
    }

    /// Replaces both collections and persists them, returning the first
    /// backend error.
    pub fn replace_all(&self, tags: Vec<Tag>, note_tags: Vec<NoteTag>) -> Result<()> {
        let ((), tag_snapshot) = self.tags.mutate(|items| *items = tags);
        let ((), link_snapshot) = self.links.mutate(|items| *items = note_tags);
        self.tags
            .persist(&tag_snapshot, |items| self.backend.save_tags(items))?;
        self.links
            .persist(&link_snapshot, |items| self.backend.save_note_tags(items))?;
        Ok(())
    }

    fn save_tags(&self, snapshot: &Snapshot<Tag>, context: &str) {
        if let Err(e) = self
            .tags
            .persist(snapshot, |items| self.backend.save_tags(items))
        {
            self.tags.fail(context, &e);
        }
    }

    fn save_links(&self, snapshot: &Snapshot<NoteTag>, context: &str) {
        if let Err(e) = self
            .links
            .persist(snapshot, |items| self.backend.save_note_tags(items))
        {
            self.links.fail(context, &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::testing::FailingStorage;
    use crate::MemoryStorage;

    fn new_tag(name: &str) -> NewTag {
        NewTag {
            name: name.to_string(),
            color: "#ff0000".to_string(),
        }
    }

    #[test]
    fn test_add_note_tag_is_idempotent() {
        let backend = Arc::new(MemoryStorage::new());
        let store = TagStore::new(backend.clone());
        let tag = store.add_tag(new_tag("urgent"));
        store.add_note_tag("n1", &tag);
        store.add_note_tag("n1", &tag);

        assert_eq!(backend.get_all_note_tags().unwrap(), vec![NoteTag::new("n1", &tag)]);
        let tags = store.get_note_tags("n1");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "urgent");
        assert!(store.get_note_tags("n2").is_empty());
    }

    #[test]
    fn test_delete_tag_removes_links() {
        let backend = Arc::new(MemoryStorage::new());
        let store = TagStore::new(backend.clone());
        let a = store.add_tag(new_tag("a"));
        let b = store.add_tag(new_tag("b"));
        store.add_note_tag("n1", &a);
        store.add_note_tag("n1", &b);
        store.add_note_tag("n2", &a);

        assert!(store.delete_tag(&a));
        assert!(!store.delete_tag(&a));
        assert_eq!(backend.get_all_tags().unwrap().len(), 1);
        assert_eq!(backend.get_all_note_tags().unwrap(), vec![NoteTag::new("n1", &b)]);
    }

    #[test]
    fn test_remove_note_tag() {
        let backend = Arc::new(MemoryStorage::new());
        let store = TagStore::new(backend.clone());
        let a = store.add_tag(new_tag("a"));
        store.add_note_tag("n1", &a);
        store.remove_note_tag("n1", &a);
        assert!(backend.get_all_note_tags().unwrap().is_empty());
        assert!(store.get_note_tags("n1").is_empty());
    }

    #[test]
    fn test_update_tag_renames() {
        let store = TagStore::new(Arc::new(MemoryStorage::new()));
        let id = store.add_tag(new_tag("old"));
        assert!(store.update_tag(
            &id,
            TagPatch {
                name: Some("new".to_string()),
                ..TagPatch::default()
            }
        ));
        assert_eq!(store.get(&id).unwrap().name, "new");
        assert_eq!(store.get(&id).unwrap().color, "#ff0000");
    }

    #[test]
    fn test_load_reads_both_collections() {
        let backend = Arc::new(MemoryStorage::new());
        let tag = Tag::new(new_tag("x"), Utc::now());
        backend.save_tags(std::slice::from_ref(&tag)).unwrap();
        backend
            .save_note_tags(&[NoteTag::new("n1", &tag.id)])
            .unwrap();

        let store = TagStore::new(backend);
        assert!(store.load());
        assert_eq!(store.get_note_tags("n1"), vec![tag]);
    }

    #[test]
    fn test_failures_are_recorded() {
        let store = TagStore::new(Arc::new(FailingStorage::new()));
        assert!(!store.load());
        assert!(store.error().is_some());
        store.clear_error();
        store.add_tag(new_tag("x"));
        assert!(store.error().unwrap().contains("disk full"));
    }
}
