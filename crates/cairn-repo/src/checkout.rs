//! Materialize a tree onto the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use cairn_store::{Blob, EntryMode, ObjectStore, Tree};
use cairn_types::ObjectId;
use tracing::{debug, warn};

use crate::error::{RepoError, RepoResult};
use crate::repository::REPO_DIR;

/// Counts of what a checkout wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckoutStats {
    pub files: usize,
    pub dirs: usize,
    pub skipped: usize,
}

/// Resolve an entry name (a segment, or a `/`-separated path from a flat
/// tree) under `base`, refusing anything that could escape it.
fn entry_path(base: &Path, name: &str) -> RepoResult<PathBuf> {
    let mut path = base.to_path_buf();
    for segment in name.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment == REPO_DIR {
            return Err(RepoError::InvalidPath(format!(
                "refusing to write tree entry {name:?}"
            )));
        }
        if segment.contains('\\') {
            return Err(RepoError::InvalidPath(format!(
                "tree entry {name:?} contains a backslash"
            )));
        }
        path.push(segment);
    }
    Ok(path)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> RepoResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> RepoResult<()> {
    Ok(())
}

/// Write every blob reachable from `tree_id` under `dest`, creating
/// directories as needed. Existing files are overwritten. Symlink and
/// gitlink entries are skipped.
pub fn checkout_tree(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
    dest: &Path,
) -> RepoResult<CheckoutStats> {
    let mut stats = CheckoutStats::default();
    fs::create_dir_all(dest)?;
    checkout_into(store, tree_id, dest, &mut stats)?;
    debug!(tree = %tree_id, files = stats.files, dirs = stats.dirs, "checkout complete");
    Ok(stats)
}

fn checkout_into(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
    dir: &Path,
    stats: &mut CheckoutStats,
) -> RepoResult<()> {
    let tree = Tree::from_stored_object(&store.load(tree_id)?)?;
    for entry in &tree.entries {
        let path = entry_path(dir, &entry.name)?;
        match entry.mode {
            EntryMode::Directory => {
                fs::create_dir_all(&path)?;
                stats.dirs += 1;
                checkout_into(store, &entry.object_id, &path, stats)?;
            }
            EntryMode::Regular | EntryMode::Executable => {
                let blob = Blob::from_stored_object(&store.load(&entry.object_id)?)?;
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, &blob.data)?;
                if entry.mode == EntryMode::Executable {
                    mark_executable(&path)?;
                }
                stats.files += 1;
            }
            EntryMode::Symlink | EntryMode::Gitlink => {
                warn!(name = %entry.name, mode = %entry.mode, "skipping unsupported entry");
                stats.skipped += 1;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_store::{InMemoryObjectStore, StoreError, TreeEntry};

    fn blob(store: &InMemoryObjectStore, data: &[u8]) -> ObjectId {
        store.store("blob", data).unwrap()
    }

    fn tree(store: &InMemoryObjectStore, entries: Vec<TreeEntry>) -> ObjectId {
        store
            .write(&Tree::new(entries).to_stored_object().unwrap())
            .unwrap()
    }

    #[test]
    fn nested_checkout() {
        let store = InMemoryObjectStore::new();
        let inner = tree(
            &store,
            vec![TreeEntry::new(EntryMode::Regular, "deep.txt", blob(&store, b"deep"))],
        );
        let root = tree(
            &store,
            vec![
                TreeEntry::new(EntryMode::Regular, "a.txt", blob(&store, b"hello\n")),
                TreeEntry::new(EntryMode::Directory, "sub", inner),
            ],
        );

        let dir = tempfile::tempdir().unwrap();
        let stats = checkout_tree(&store, &root, dir.path()).unwrap();
        assert_eq!(stats, CheckoutStats { files: 2, dirs: 1, skipped: 0 });
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"hello\n");
        assert_eq!(fs::read(dir.path().join("sub/deep.txt")).unwrap(), b"deep");
    }

    #[test]
    fn flat_names_create_directories() {
        let store = InMemoryObjectStore::new();
        let root = tree(
            &store,
            vec![TreeEntry::new(EntryMode::Regular, "x/y/z.txt", blob(&store, b"z"))],
        );
        let dir = tempfile::tempdir().unwrap();
        checkout_tree(&store, &root, dir.path()).unwrap();
        assert_eq!(fs::read(dir.path().join("x/y/z.txt")).unwrap(), b"z");
    }

    #[test]
    fn refuses_escaping_names() {
        let store = InMemoryObjectStore::new();
        let id = blob(&store, b"evil");
        for name in ["../evil", "a/../../evil", ".git/HEAD", "a//b"] {
            let root = tree(&store, vec![TreeEntry::new(EntryMode::Regular, name, id)]);
            let dir = tempfile::tempdir().unwrap();
            let err = checkout_tree(&store, &root, &dir.path().join("out")).unwrap_err();
            assert!(matches!(err, RepoError::InvalidPath(_)), "{name}");
        }
    }

    #[test]
    fn skips_symlinks() {
        let store = InMemoryObjectStore::new();
        let root = tree(
            &store,
            vec![TreeEntry::new(EntryMode::Symlink, "link", blob(&store, b"target"))],
        );
        let dir = tempfile::tempdir().unwrap();
        let stats = checkout_tree(&store, &root, dir.path()).unwrap();
        assert_eq!(stats.skipped, 1);
        assert!(!dir.path().join("link").exists());
    }

    #[test]
    fn missing_blob_is_not_found() {
        let store = InMemoryObjectStore::new();
        let root = tree(
            &store,
            vec![TreeEntry::new(EntryMode::Regular, "gone", ObjectId::from_hash([9; 20]))],
        );
        let dir = tempfile::tempdir().unwrap();
        let err = checkout_tree(&store, &root, dir.path()).unwrap_err();
        assert!(matches!(err, RepoError::Store(StoreError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_is_restored() {
        use std::os::unix::fs::PermissionsExt;
        let store = InMemoryObjectStore::new();
        let root = tree(
            &store,
            vec![TreeEntry::new(EntryMode::Executable, "run.sh", blob(&store, b"#!/bin/sh\n"))],
        );
        let dir = tempfile::tempdir().unwrap();
        checkout_tree(&store, &root, dir.path()).unwrap();
        let mode = fs::metadata(dir.path().join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
