// ── Generic registry collection ──
//
// Lock-free concurrent storage with O(1) lookups by key and by registry id.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

/// A lock-free collection for one registry.
///
/// Entries are stored under a string key (entity id, or the
/// `config_entry/device` pair for devices) and indexed by their registry
/// [`Uuid`].
pub(crate) struct Collection<T: Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,
    id_to_key: DashMap<Uuid, String>,
    key_to_id: DashMap<String, Uuid>,
}

impl<T: Send + Sync + 'static> Collection<T> {
    pub(crate) fn new() -> Self {
        Self {
            by_key: DashMap::new(),
            id_to_key: DashMap::new(),
            key_to_id: DashMap::new(),
        }
    }

    /// Insert or replace an entry. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: String, id: Uuid, entry: T) -> bool {
        if let Some(old_id) = self.key_to_id.get(&key).map(|r| *r) {
            if old_id != id {
                self.id_to_key.remove(&old_id);
            }
        }

        let is_new = self.by_key.insert(key.clone(), Arc::new(entry)).is_none();
        self.id_to_key.insert(id, key.clone());
        self.key_to_id.insert(key, id);
        is_new
    }

    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            if let Some((_, id)) = self.key_to_id.remove(key) {
                self.id_to_key.remove(&id);
            }
        }
        removed
    }

    pub(crate) fn remove_by_id(&self, id: Uuid) -> Option<Arc<T>> {
        let key = self.id_to_key.get(&id).map(|r| r.value().clone())?;
        self.remove(&key)
    }

    pub(crate) fn get_by_key(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn id_of(&self, key: &str) -> Option<Uuid> {
        self.key_to_id.get(key).map(|r| *r)
    }

    /// Entries matching `keep`, in no particular order.
    pub(crate) fn filtered(&self, keep: impl Fn(&T) -> bool) -> Vec<Arc<T>> {
        self.by_key
            .iter()
            .filter(|r| keep(r.value()))
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }
}
