//! Snapshot a working directory into tree objects.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use cairn_store::{Blob, EntryMode, ObjectStore, Tree, TreeEntry};
use cairn_types::ObjectId;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::{RepoConfig, TreeLayout};
use crate::error::{RepoError, RepoResult};
use crate::repository::REPO_DIR;

/// Directory contents collected before trees are written bottom-up.
#[derive(Default)]
struct DirNode {
    files: Vec<TreeEntry>,
    dirs: BTreeMap<String, DirNode>,
}

impl DirNode {
    fn insert(&mut self, components: &[String], blob: ObjectId) {
        match components {
            [name] => self.files.push(TreeEntry::new(EntryMode::Regular, name.clone(), blob)),
            [dir, rest @ ..] => self.dirs.entry(dir.clone()).or_default().insert(rest, blob),
            [] => {}
        }
    }

    fn write(self, store: &dyn ObjectStore) -> RepoResult<ObjectId> {
        let mut entries = self.files;
        for (name, child) in self.dirs {
            let id = child.write(store)?;
            entries.push(TreeEntry::new(EntryMode::Directory, name, id));
        }
        let tree = Tree::new(entries);
        Ok(store.write(&tree.to_stored_object()?)?)
    }
}

fn is_ignored(entry: &DirEntry, config: &RepoConfig) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == REPO_DIR || config.ignore.iter().any(|i| *i == name)
}

/// Store every regular file under `root` as a blob and return the address
/// of the root tree.
///
/// File modes are always `100644`; symlinks and other special files are
/// skipped. Empty directories produce no tree. An empty `root` yields the
/// empty tree.
pub fn write_tree(
    store: &dyn ObjectStore,
    root: &Path,
    config: &RepoConfig,
) -> RepoResult<ObjectId> {
    let mut files: Vec<(Vec<String>, ObjectId)> = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e, config));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            if entry.file_type().is_symlink() {
                debug!(path = %entry.path().display(), "skipping symlink");
            }
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| RepoError::InvalidPath(entry.path().display().to_string()))?;
        let components = rel
            .components()
            .map(|c| {
                c.as_os_str().to_str().map(str::to_string).ok_or_else(|| {
                    RepoError::InvalidPath(format!("{} is not valid UTF-8", rel.display()))
                })
            })
            .collect::<RepoResult<Vec<String>>>()?;

        let data = fs::read(entry.path())?;
        let id = store.write(&Blob::new(data).to_stored_object())?;
        debug!(path = %rel.display(), blob = %id.short_hex(), "blob stored");
        files.push((components, id));
    }

    let root_id = match config.layout {
        TreeLayout::Flat => {
            let entries = files
                .into_iter()
                .map(|(components, id)| {
                    TreeEntry::new(EntryMode::Regular, components.join("/"), id)
                })
                .collect();
            store.write(&Tree::new(entries).to_stored_object()?)?
        }
        TreeLayout::Nested => {
            let mut root_node = DirNode::default();
            for (components, id) in &files {
                root_node.insert(components, *id);
            }
            root_node.write(store)?
        }
    };
    debug!(tree = %root_id, layout = ?config.layout, "snapshot written");
    Ok(root_id)
}
