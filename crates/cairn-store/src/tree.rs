//! Tree objects and their binary record format.
//!
//! A tree payload is a plain concatenation of records:
//!
//! ```text
//! <mode> <name>\0<20 raw address bytes>
//! ```
//!
//! There is no record separator and no count; the NUL terminates the text
//! part and the address has a fixed width.

use std::cmp::Ordering;
use std::fmt;

use cairn_types::object::OID_LEN;
use cairn_types::{ObjectId, ObjectKind};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;

/// File mode for a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// Normal file (`100644`).
    Regular,
    /// Executable file (`100755`).
    Executable,
    /// Symbolic link (`120000`).
    Symlink,
    /// Subtree / directory (`40000`).
    Directory,
    /// Submodule commit (`160000`).
    Gitlink,
}

impl EntryMode {
    /// The mode token written into a tree record.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Directory => "40000",
            Self::Gitlink => "160000",
        }
    }

    /// Parse a mode token. `040000` is accepted as a directory.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "100644" => Some(Self::Regular),
            "100755" => Some(Self::Executable),
            "120000" => Some(Self::Symlink),
            "40000" | "040000" => Some(Self::Directory),
            "160000" => Some(Self::Gitlink),
            _ => None,
        }
    }

    /// The kind of object an entry with this mode points at.
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            Self::Directory => ObjectKind::Tree,
            Self::Gitlink => ObjectKind::Commit,
            _ => ObjectKind::Blob,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `ls-tree` pads directory modes to six digits.
        write!(f, "{:0>6}", self.as_str())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File mode (regular, executable, symlink, directory, gitlink).
    pub mode: EntryMode,
    /// Entry name. A single path segment in nested trees, a full relative
    /// path in flat ones.
    pub name: String,
    /// Content-addressed ID of the referenced object.
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }

    /// Names must be non-empty and free of NUL, or the record cannot be
    /// decoded again.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("empty entry name".into());
        }
        if self.name.contains('\0') {
            return Err(format!("entry name {:?} contains NUL", self.name));
        }
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        self.mode.as_str().len() + 1 + self.name.len() + 1 + OID_LEN
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical git order: bytewise by name, with directories compared as if
/// their name ended in `/`.
impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        let key = |e: &Self| {
            let suffix: &[u8] = if e.mode.is_tree() { b"/" } else { b"" };
            e.name.as_bytes().iter().chain(suffix).copied().collect::<Vec<u8>>()
        };
        key(self)
            .cmp(&key(other))
            .then_with(|| self.object_id.cmp(&other.object_id))
    }
}

/// Encode entries into a tree payload, in the order given.
pub fn serialize(entries: &[TreeEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.iter().map(TreeEntry::encoded_len).sum());
    for entry in entries {
        out.extend_from_slice(entry.mode.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(entry.name.as_bytes());
        out.push(0);
        out.extend_from_slice(entry.object_id.as_bytes());
    }
    out
}

/// Decode a tree payload into its entries, preserving record order.
pub fn deserialize(payload: &[u8]) -> StoreResult<Vec<TreeEntry>> {
    let malformed = |offset: usize, reason: String| StoreError::MalformedTree { offset, reason };

    let mut entries = Vec::new();
    let mut cursor = 0;
    while cursor < payload.len() {
        let rest = &payload[cursor..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| malformed(cursor, "entry header has no NUL terminator".into()))?;

        let head = &rest[..nul];
        let space = head
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| malformed(cursor, "entry header has no space separator".into()))?;

        let mode_token = std::str::from_utf8(&head[..space])
            .map_err(|_| malformed(cursor, "entry mode is not UTF-8".into()))?;
        let mode = EntryMode::parse(mode_token)
            .ok_or_else(|| malformed(cursor, format!("unknown entry mode {mode_token:?}")))?;

        let name = std::str::from_utf8(&head[space + 1..])
            .map_err(|_| malformed(cursor, "entry name is not UTF-8".into()))?;
        if name.is_empty() {
            return Err(malformed(cursor, "empty entry name".into()));
        }

        let addr_start = nul + 1;
        if rest.len() - addr_start < OID_LEN {
            return Err(malformed(
                cursor,
                format!(
                    "expected {OID_LEN} address bytes after {name:?}, found {}",
                    rest.len() - addr_start
                ),
            ));
        }
        let object_id = ObjectId::from_slice(&rest[addr_start..addr_start + OID_LEN])
            .map_err(|e| malformed(cursor, e.to_string()))?;

        entries.push(TreeEntry::new(mode, name, object_id));
        cursor += addr_start + OID_LEN;
    }
    Ok(entries)
}

/// Directory listing object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries in record order.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries.
    ///
    /// Entries are sorted canonically for deterministic hashing.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Create a tree that keeps `entries` in the order given.
    pub fn from_ordered(entries: Vec<TreeEntry>) -> Self {
        Self { entries }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let mut offset = 0;
        for entry in &self.entries {
            entry
                .validate()
                .map_err(|reason| StoreError::MalformedTree { offset, reason })?;
            offset += entry.encoded_len();
        }
        Ok(StoredObject::new(ObjectKind::Tree, serialize(&self.entries)))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Tree {
            obj.expect_kind(&obj.compute_id(), &ObjectKind::Tree)?;
        }
        Ok(Self {
            entries: deserialize(&obj.data)?,
        })
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_crypto::ContentHasher;
    use proptest::prelude::*;

    fn addr(content: &[u8]) -> ObjectId {
        ContentHasher::BLOB.hash(content)
    }

    fn zero_id() -> ObjectId {
        ObjectId::from_hash([0; 20])
    }

    #[test]
    fn two_entries_roundtrip_in_order() {
        let entries = vec![
            TreeEntry::new(EntryMode::Regular, "a.txt", addr(b"a")),
            TreeEntry::new(EntryMode::Regular, "b.txt", addr(b"b")),
        ];
        let payload = serialize(&entries);
        assert_eq!(payload.len(), 2 * (6 + 1 + 5 + 1 + 20));
        assert_eq!(deserialize(&payload).unwrap(), entries);
    }

    #[test]
    fn serialize_keeps_caller_order() {
        let entries = vec![
            TreeEntry::new(EntryMode::Regular, "z", addr(b"z")),
            TreeEntry::new(EntryMode::Regular, "a", addr(b"a")),
        ];
        let decoded = deserialize(&serialize(&entries)).unwrap();
        assert_eq!(decoded[0].name, "z");
        assert_eq!(decoded[1].name, "a");
    }

    #[test]
    fn record_layout_is_exact() {
        let id = addr(b"hello\n");
        let payload = serialize(&[TreeEntry::new(EntryMode::Regular, "hello.txt", id)]);
        let mut expected = b"100644 hello.txt\0".to_vec();
        expected.extend_from_slice(id.as_bytes());
        assert_eq!(payload, expected);
    }

    #[test]
    fn empty_payload_is_empty_tree() {
        assert!(deserialize(b"").unwrap().is_empty());
        let stored = Tree::new(Vec::new()).to_stored_object().unwrap();
        assert_eq!(
            stored.compute_id().to_hex(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[test]
    fn truncated_address_is_rejected() {
        let mut payload = b"100644 a.txt\0".to_vec();
        payload.extend_from_slice(&[0xab; 19]);
        let err = deserialize(&payload).unwrap_err();
        assert!(matches!(err, StoreError::MalformedTree { offset: 0, .. }));
    }

    #[test]
    fn truncated_second_record_reports_offset() {
        let first = TreeEntry::new(EntryMode::Regular, "a", addr(b"a"));
        let mut payload = serialize(&[first]);
        let second_at = payload.len();
        payload.extend_from_slice(b"100644 b\0\x01\x02");
        let err = deserialize(&payload).unwrap_err();
        match err {
            StoreError::MalformedTree { offset, .. } => assert_eq!(offset, second_at),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_space_is_rejected() {
        let mut payload = b"100644a.txt\0".to_vec();
        payload.extend_from_slice(&[0; 20]);
        assert!(matches!(
            deserialize(&payload).unwrap_err(),
            StoreError::MalformedTree { .. }
        ));
    }

    #[test]
    fn missing_nul_is_rejected() {
        assert!(matches!(
            deserialize(b"100644 a.txt").unwrap_err(),
            StoreError::MalformedTree { .. }
        ));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut payload = b"777 a\0".to_vec();
        payload.extend_from_slice(&[0; 20]);
        assert!(matches!(
            deserialize(&payload).unwrap_err(),
            StoreError::MalformedTree { .. }
        ));
    }

    #[test]
    fn directory_mode_has_no_leading_zero() {
        let entry = TreeEntry::new(EntryMode::Directory, "src", zero_id());
        assert!(serialize(&[entry]).starts_with(b"40000 src\0"));
        assert_eq!(EntryMode::parse("040000"), Some(EntryMode::Directory));
        assert_eq!(format!("{}", EntryMode::Directory), "040000");
        assert_eq!(format!("{}", EntryMode::Regular), "100644");
    }

    #[test]
    fn name_may_contain_spaces() {
        let entries = vec![TreeEntry::new(EntryMode::Regular, "my file.txt", addr(b"x"))];
        assert_eq!(deserialize(&serialize(&entries)).unwrap(), entries);
    }

    #[test]
    fn canonical_sort_treats_directories_as_slash_suffixed() {
        // '.' < '/' < '0'
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "foo0", zero_id()),
            TreeEntry::new(EntryMode::Directory, "foo", zero_id()),
            TreeEntry::new(EntryMode::Regular, "foo.c", zero_id()),
        ]);
        let names: Vec<_> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["foo.c", "foo", "foo0"]);
    }

    #[test]
    fn invalid_names_fail_to_store() {
        let tree = Tree::from_ordered(vec![
            TreeEntry::new(EntryMode::Regular, "ok", zero_id()),
            TreeEntry::new(EntryMode::Regular, "bad\0name", zero_id()),
        ]);
        match tree.to_stored_object().unwrap_err() {
            StoreError::MalformedTree { offset, .. } => assert_eq!(offset, 6 + 1 + 2 + 1 + 20),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(Tree::from_ordered(vec![TreeEntry::new(EntryMode::Regular, "", zero_id())])
            .to_stored_object()
            .is_err());
    }

    #[test]
    fn tree_stored_roundtrip_and_lookup() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "file.txt", addr(b"content")),
            TreeEntry::new(EntryMode::Directory, "subdir", zero_id()),
        ]);
        let stored = tree.to_stored_object().unwrap();
        let decoded = Tree::from_stored_object(&stored).unwrap();
        assert_eq!(tree, decoded);
        assert!(decoded.get("file.txt").is_some());
        assert!(decoded.get("missing").is_none());
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn tree_kind_mismatch() {
        let stored = StoredObject::new(ObjectKind::Blob, Vec::new());
        assert!(matches!(
            Tree::from_stored_object(&stored).unwrap_err(),
            StoreError::KindMismatch { .. }
        ));
    }

    #[test]
    fn entry_json_shape() {
        let entry = TreeEntry::new(EntryMode::Directory, "src", zero_id());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["mode"], "directory");
        assert_eq!(value["name"], "src");
        assert_eq!(value["object_id"], "0".repeat(40));
    }

    fn arb_mode() -> impl Strategy<Value = EntryMode> {
        prop_oneof![
            Just(EntryMode::Regular),
            Just(EntryMode::Executable),
            Just(EntryMode::Symlink),
            Just(EntryMode::Directory),
            Just(EntryMode::Gitlink),
        ]
    }

    fn arb_entry() -> impl Strategy<Value = TreeEntry> {
        (arb_mode(), "[a-zA-Z0-9 ._/-]{1,24}", any::<[u8; 20]>())
            .prop_map(|(mode, name, id)| TreeEntry::new(mode, name, ObjectId::from_hash(id)))
    }

    proptest! {
        #[test]
        fn deserialize_inverts_serialize(entries in prop::collection::vec(arb_entry(), 0..16)) {
            prop_assert_eq!(deserialize(&serialize(&entries)).unwrap(), entries);
        }

        #[test]
        fn truncation_never_decodes_silently(
            entries in prop::collection::vec(arb_entry(), 1..6),
            cut in 1usize..20,
        ) {
            let payload = serialize(&entries);
            let truncated = &payload[..payload.len() - cut];
            prop_assert!(deserialize(truncated).is_err());
        }
    }
}
