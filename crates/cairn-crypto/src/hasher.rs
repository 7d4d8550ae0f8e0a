use cairn_types::{ObjectId, ObjectKind};
use sha1::{Digest, Sha1};

/// Object header: `"<kind> <len>\0"`.
pub fn header(kind: &ObjectKind, len: usize) -> Vec<u8> {
    format!("{} {}\0", kind.as_str(), len).into_bytes()
}

/// Full framed object bytes: header followed by the payload.
pub fn frame(kind: &ObjectKind, payload: &[u8]) -> Vec<u8> {
    let mut framed = header(kind, payload.len());
    framed.extend_from_slice(payload);
    framed
}

/// SHA-1 content hasher over framed objects.
///
/// Each hasher carries the object kind that is written into the header, so a
/// blob and a tree with identical payload bytes produce different addresses.
/// The hasher streams the header and the payload separately and never builds
/// the framed buffer.
pub struct ContentHasher {
    kind: ObjectKind,
}

impl ContentHasher {
    /// Hasher for blob objects.
    pub const BLOB: Self = Self {
        kind: ObjectKind::Blob,
    };

    /// Create a hasher for any kind.
    pub fn new(kind: ObjectKind) -> Self {
        Self { kind }
    }

    /// Address of `payload` framed with this hasher's kind.
    pub fn hash(&self, payload: &[u8]) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(header(&self.kind, payload.len()));
        hasher.update(payload);
        ObjectId::from_hash(hasher.finalize().into())
    }

    /// Verify that `payload` produces the expected object ID.
    pub fn verify(&self, payload: &[u8], expected: &ObjectId) -> bool {
        self.hash(payload) == *expected
    }
}
