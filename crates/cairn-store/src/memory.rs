use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;

use cairn_types::ObjectId;

use crate::error::StoreResult;
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Object store that keeps decoded objects in process memory.
///
/// Used by the codec and snapshot tests, and anywhere a throwaway store is
/// handy. Keys are kept ordered so `list` needs no sort.
#[derive(Default)]
pub struct InMemoryObjectStore {
    map: RwLock<BTreeMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        Ok(self.map.read().expect("lock poisoned").get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        self.map
            .write()
            .expect("lock poisoned")
            .entry(id)
            .or_insert_with(|| object.clone());
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.map.read().expect("lock poisoned").contains_key(id))
    }

    fn list(&self) -> StoreResult<Vec<ObjectId>> {
        Ok(self.map.read().expect("lock poisoned").keys().copied().collect())
    }
}

impl fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &self.len())
            .finish()
    }
}
