use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cairn_crypto::ContentHasher;
use cairn_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Tuning for a [`LooseObjectStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LooseOptions {
    /// zlib level, 0 (store) through 10.
    pub compression_level: u8,
    /// Re-hash every object on read and fail on mismatch.
    pub verify_on_read: bool,
}

impl Default for LooseOptions {
    fn default() -> Self {
        Self {
            compression_level: 6,
            verify_on_read: true,
        }
    }
}

/// On-disk store using git's loose object layout.
///
/// Each object lives at `<root>/<first 2 hex>/<remaining 38 hex>` as a zlib
/// stream of `"<kind> <len>\0<payload>"`. Writes land in a temporary file
/// inside the bucket and are renamed into place, so readers never observe a
/// partial stream.
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    root: PathBuf,
    options: LooseOptions,
}

impl LooseObjectStore {
    /// Open a store rooted at an existing `objects` directory.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, LooseOptions::default())
    }

    pub fn with_options(root: impl Into<PathBuf>, options: LooseOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Create the root directory if needed and open the store.
    pub fn init(root: impl Into<PathBuf>, options: LooseOptions) -> StoreResult<Self> {
        let store = Self::with_options(root, options);
        fs::create_dir_all(&store.root)?;
        Ok(store)
    }

    /// The `objects` directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &LooseOptions {
        &self.options
    }

    /// Where the object with `id` lives (whether or not it exists).
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.root.join(id.bucket()).join(id.entry_name())
    }

    fn inflate(&self, id: &ObjectId, compressed: &[u8]) -> StoreResult<Vec<u8>> {
        miniz_oxide::inflate::decompress_to_vec_zlib(compressed).map_err(|e| {
            StoreError::CorruptObject {
                id: *id,
                reason: format!("zlib stream does not inflate: {:?}", e.status),
            }
        })
    }
}

/// Loose objects are immutable, so they are stored `0444` like git's.
#[cfg(unix)]
fn mark_read_only(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o444))
}

#[cfg(not(unix))]
fn mark_read_only(file: &fs::File) -> io::Result<()> {
    let mut perms = file.metadata()?.permissions();
    perms.set_readonly(true);
    file.set_permissions(perms)
}

impl ObjectStore for LooseObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let framed = self.inflate(id, &compressed)?;
        let object = StoredObject::decode(id, &framed)?;

        if self.options.verify_on_read {
            let hasher = ContentHasher::new(object.kind.clone());
            if !hasher.verify(&object.data, id) {
                let computed = hasher.hash(&object.data);
                warn!(id = %id, computed = %computed, "object content does not match its address");
                return Err(StoreError::IntegrityViolation { id: *id, computed });
            }
        }

        debug!(id = %id.short_hex(), kind = %object.kind, size = object.size, "object read");
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let path = self.object_path(&id);
        if self.exists(&id)? {
            debug!(id = %id.short_hex(), "object already present");
            return Ok(id);
        }
        let bucket = self.root.join(id.bucket());
        fs::create_dir_all(&bucket)?;

        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(
            &object.encode(),
            self.options.compression_level,
        );

        let mut tmp = NamedTempFile::new_in(&bucket)?;
        tmp.write_all(&compressed)?;
        tmp.as_file().sync_all()?;
        mark_read_only(tmp.as_file())?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(
            id = %id.short_hex(),
            kind = %object.kind,
            size = object.size,
            compressed = compressed.len(),
            "object written"
        );
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        match fs::metadata(self.object_path(id)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StoreResult<Vec<ObjectId>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let bucket = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let name = entry.file_name().to_str().unwrap_or_default();
            if bucket.len() != 2 || name.len() != 38 {
                debug!(path = %entry.path().display(), "skipping non-object file");
                continue;
            }
            match ObjectId::from_hex(&format!("{bucket}{name}")) {
                Ok(id) => ids.push(id),
                Err(_) => debug!(path = %entry.path().display(), "skipping non-object file"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
