use cairn_crypto::{frame, ContentHasher};
use cairn_types::{ObjectId, ObjectKind};

use crate::error::{StoreError, StoreResult};

/// A stored object: kind tag + payload bytes + cached size.
///
/// `StoredObject` is the unit of storage. The store never interprets the
/// payload; it is a pure key-value store keyed by content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The payload bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        ContentHasher::new(self.kind.clone()).hash(&self.data)
    }

    /// The framed bytes `"<kind> <len>\0<payload>"` that get compressed.
    pub fn encode(&self) -> Vec<u8> {
        frame(&self.kind, &self.data)
    }

    /// Parse framed bytes back into an object.
    ///
    /// `id` is only used to label errors. The header is split at the first
    /// NUL; the kind is everything before the first space and the rest must
    /// be a decimal length equal to the payload length.
    pub fn decode(id: &ObjectId, framed: &[u8]) -> StoreResult<Self> {
        let corrupt = |reason: &str| StoreError::CorruptObject {
            id: *id,
            reason: reason.to_string(),
        };

        let nul = framed
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| corrupt("missing NUL after header"))?;
        let header =
            std::str::from_utf8(&framed[..nul]).map_err(|_| corrupt("header is not UTF-8"))?;
        let (kind, len) = header
            .split_once(' ')
            .ok_or_else(|| corrupt("header has no space separator"))?;

        let kind = ObjectKind::parse(kind).map_err(|e| corrupt(&e.to_string()))?;
        if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
            return Err(corrupt(&format!("declared length {len:?} is not decimal")));
        }
        let declared: u64 = len
            .parse()
            .map_err(|_| corrupt(&format!("declared length {len:?} overflows")))?;

        let payload = &framed[nul + 1..];
        if declared != payload.len() as u64 {
            return Err(corrupt(&format!(
                "declared length {declared} but payload is {} bytes",
                payload.len()
            )));
        }

        Ok(Self::new(kind, payload.to_vec()))
    }

    /// Fail with [`StoreError::KindMismatch`] unless this object is `expected`.
    pub fn expect_kind(&self, id: &ObjectId, expected: &ObjectKind) -> StoreResult<()> {
        if &self.kind != expected {
            return Err(StoreError::KindMismatch {
                id: *id,
                expected: expected.to_string(),
                actual: self.kind.to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object (file contents).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from raw bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Address `data` would have as a blob, without building the object.
    pub fn address(data: &[u8]) -> ObjectId {
        ContentHasher::BLOB.hash(data)
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Blob {
            obj.expect_kind(&obj.compute_id(), &ObjectKind::Blob)?;
        }
        Ok(Self {
            data: obj.data.clone(),
        })
    }
}
