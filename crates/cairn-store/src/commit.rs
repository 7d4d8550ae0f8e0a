use cairn_types::{ObjectId, ObjectKind};

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;

/// Snapshot event: one root tree plus a message.
///
/// Payload layout is `"tree <40-hex>\n\n<message>\n"`. There are no parent,
/// author, or timestamp headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// Root tree of the snapshot. Not checked for existence.
    pub tree: ObjectId,
    /// Free-form message, stored without its trailing newline.
    pub message: String,
}

impl Commit {
    pub fn new(tree: ObjectId, message: impl Into<String>) -> Self {
        Self {
            tree,
            message: message.into(),
        }
    }

    /// Build the commit payload.
    pub fn encode(&self) -> Vec<u8> {
        format!("tree {}\n\n{}\n", self.tree.to_hex(), self.message).into_bytes()
    }

    /// Parse a commit payload.
    ///
    /// Header lines other than `tree` are skipped, so commits written by
    /// other tools still yield their root tree.
    pub fn decode(payload: &[u8]) -> StoreResult<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| StoreError::MalformedCommit("payload is not UTF-8".into()))?;
        let (headers, body) = text
            .split_once("\n\n")
            .ok_or_else(|| StoreError::MalformedCommit("no blank line after headers".into()))?;

        let tree_hex = headers
            .lines()
            .find_map(|line| line.strip_prefix("tree "))
            .ok_or_else(|| StoreError::MalformedCommit("missing tree header".into()))?;
        let tree = ObjectId::from_hex(tree_hex)
            .map_err(|e| StoreError::MalformedCommit(format!("bad tree address: {e}")))?;

        let message = body.strip_suffix('\n').unwrap_or(body);
        Ok(Self::new(tree, message))
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Commit, self.encode())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Commit {
            obj.expect_kind(&obj.compute_id(), &ObjectKind::Commit)?;
        }
        Self::decode(&obj.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

    fn tree_id() -> ObjectId {
        ObjectId::from_hex(TREE).unwrap()
    }

    #[test]
    fn encode_exact_layout() {
        let commit = Commit::new(tree_id(), "initial commit");
        assert_eq!(
            commit.encode(),
            format!("tree {TREE}\n\ninitial commit\n").into_bytes()
        );
    }

    #[test]
    fn address_is_deterministic() {
        let a = Commit::new(tree_id(), "initial commit").to_stored_object();
        let b = Commit::new(tree_id(), "initial commit").to_stored_object();
        assert_eq!(a.compute_id(), b.compute_id());
        assert_ne!(
            a.compute_id(),
            Commit::new(tree_id(), "other").to_stored_object().compute_id()
        );
    }

    #[test]
    fn decode_roundtrip() {
        let commit = Commit::new(tree_id(), "multi\nline\n\nmessage");
        assert_eq!(Commit::decode(&commit.encode()).unwrap(), commit);
    }

    #[test]
    fn decode_skips_foreign_headers() {
        let payload = format!(
            "tree {TREE}\nparent {TREE}\nauthor A <a@b> 0 +0000\n\nfix bug\n"
        );
        let commit = Commit::decode(payload.as_bytes()).unwrap();
        assert_eq!(commit.tree, tree_id());
        assert_eq!(commit.message, "fix bug");
    }

    #[test]
    fn decode_rejects_missing_tree() {
        let err = Commit::decode(b"parent x\n\nmsg\n").unwrap_err();
        assert!(matches!(err, StoreError::MalformedCommit(_)));
        let err = Commit::decode(b"tree nothex\n\nmsg\n").unwrap_err();
        assert!(matches!(err, StoreError::MalformedCommit(_)));
    }

    #[test]
    fn commit_kind_mismatch() {
        let stored = StoredObject::new(ObjectKind::Blob, b"hello".to_vec());
        assert!(matches!(
            Commit::from_stored_object(&stored).unwrap_err(),
            StoreError::KindMismatch { .. }
        ));
    }
}
