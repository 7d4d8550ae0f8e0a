//! Content-addressed object storage for Cairn.
//!
//! This crate implements a hash-keyed object store laid out exactly like
//! git's `.git/objects/` directory. Every piece of data (file contents,
//! directory listings, commits) is stored as an immutable object identified
//! by the SHA-1 of its framed bytes.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content (file contents, arbitrary data)
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- one root tree plus a message
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`LooseObjectStore`] -- zlib-compressed files under a 2/38 hex fan-out
//! - [`InMemoryObjectStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writes are atomic: temporary file, then rename into place.
//! 3. Reads re-hash the payload and reject mismatches unless disabled.
//! 4. Objects are never deleted.
//! 5. The store never interprets object contents -- it is a pure key-value store.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod commit;
pub mod error;
pub mod loose;
pub mod memory;
pub mod object;
pub mod traits;
pub mod tree;

// Re-export primary types at crate root for ergonomic imports.
pub use commit::Commit;
pub use error::{StoreError, StoreResult};
pub use loose::{LooseObjectStore, LooseOptions};
pub use memory::InMemoryObjectStore;
pub use object::{Blob, StoredObject};
pub use traits::ObjectStore;
pub use tree::{EntryMode, Tree, TreeEntry};
