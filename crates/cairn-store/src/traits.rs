use cairn_types::{ObjectId, ObjectKind};

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same kind and payload always
///   produce the same ID.
/// - Writing an object that already exists is a no-op from the caller's
///   point of view.
/// - Objects are never deleted.
/// - The store never interprets object contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// All object IDs in the store, sorted.
    fn list(&self) -> StoreResult<Vec<ObjectId>>;

    /// Store `payload` under the kind token `kind` and return its address.
    fn store(&self, kind: &str, payload: &[u8]) -> StoreResult<ObjectId> {
        let kind = ObjectKind::parse(kind)?;
        self.write(&StoredObject::new(kind, payload.to_vec()))
    }

    /// Load an object, failing with [`StoreError::NotFound`] if absent.
    fn load(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    /// Copy every object of `source` that this store lacks. Returns the
    /// number of objects copied.
    fn import_from(&self, source: &dyn ObjectStore) -> StoreResult<usize> {
        let mut copied = 0;
        for id in source.list()? {
            if self.exists(&id)? {
                continue;
            }
            let object = source.load(&id)?;
            self.write(&object)?;
            copied += 1;
        }
        Ok(copied)
    }
}
