//! In-memory category collection mirrored to the storage backend.

use std::sync::Arc;

use chrono::Utc;

use crate::core::store::{Collection, Snapshot};
use crate::{Category, CategoryPatch, NewCategory, Result, StorageBackend};

/// Handle to the category collection. Clones share the same state.
///
/// Every mutation persists the full collection; failures are stored as
/// [`error`](Self::error) rather than returned.
#[derive(Clone)]
pub struct CategoryStore {
    inner: Arc<Collection<Category>>,
    backend: Arc<dyn StorageBackend>,
}

impl CategoryStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            inner: Arc::new(Collection::new()),
            backend,
        }
    }

    pub fn categories(&self) -> Vec<Category> {
        self.inner.items()
    }

    pub fn get(&self, id: &str) -> Option<Category> {
        self.inner.find(|c| c.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.error()
    }

    pub fn clear_error(&self) {
        self.inner.clear_error();
    }

    /// Replaces the collection without touching the backend.
    pub fn init(&self, categories: Vec<Category>) {
        self.inner.init(categories);
    }

    /// Reloads the collection from the backend.
    pub fn load(&self) -> bool {
        let backend = Arc::clone(&self.backend);
        self.inner
            .load("Failed to load categories", || backend.get_all_categories())
    }

    /// Appends a new category and returns its id.
    pub fn create(&self, data: NewCategory) -> String {
        let category = Category::new(data, Utc::now());
        let id = category.id.clone();
        let ((), snapshot) = self.inner.mutate(|items| items.push(category));
        self.save(&snapshot, "Failed to save new category");
        id
    }

    /// Applies `patch` to category `id`. Returns `false` if no such category exists.
    pub fn update(&self, id: &str, patch: CategoryPatch) -> bool {
        let now = Utc::now();
        let (found, snapshot) = self.inner.mutate(|items| {
            match items.iter_mut().find(|c| c.id == id) {
                Some(category) => {
                    category.apply(patch, now);
                    true
                }
                None => false,
            }
        });
        if found {
            self.save(&snapshot, "Failed to save updated category");
        }
        found
    }

    /// Removes category `id`. Notes that referenced it are left as they are.
    pub fn delete(&self, id: &str) -> bool {
        let (removed, snapshot) = self.inner.mutate(|items| {
            let before = items.len();
            items.retain(|c| c.id != id);
            items.len() != before
        });
        if removed {
            self.save(&snapshot, "Failed to save categories after delete");
        }
        removed
    }

    /// Replaces the collection and persists it, returning any backend error.
    pub fn replace_all(&self, categories: Vec<Category>) -> Result<()> {
        let ((), snapshot) = self.inner.mutate(|items| *items = categories);
        self.inner
            .persist(&snapshot, |items| self.backend.save_categories(items))?;
        Ok(())
    }

    fn save(&self, snapshot: &Snapshot<Category>, context: &str) {
        if let Err(e) = self
            .inner
            .persist(snapshot, |items| self.backend.save_categories(items))
        {
            self.inner.fail(context, &e);
        }
    }
}
