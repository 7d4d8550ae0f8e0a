use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cairn_store::{Blob, Commit, LooseObjectStore, ObjectStore, StoreError, StoredObject, Tree};
use cairn_types::{ObjectId, ObjectKind};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::checkout::{checkout_tree, CheckoutStats};
use crate::config::RepoConfig;
use crate::error::{RepoError, RepoResult};
use crate::snapshot;

/// Name of the repository directory inside a working tree.
pub const REPO_DIR: &str = ".git";

const HEAD_FILE: &str = "HEAD";
const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";

/// Result of [`Repository::clone_from`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloneReport {
    /// Objects copied into the destination store.
    pub objects: usize,
    /// Files copied from `refs/`.
    pub refs: usize,
}

/// A repository rooted at an explicit working tree.
///
/// All state lives under `<work_tree>/.git`: the `HEAD` marker, the
/// `objects/` fan-out, `refs/`, and an optional `cairn.toml`.
#[derive(Debug)]
pub struct Repository {
    work_tree: PathBuf,
    repo_dir: PathBuf,
    config: RepoConfig,
    store: LooseObjectStore,
}

impl Repository {
    /// Create (or re-initialize) a repository with default settings.
    pub fn init(work_tree: impl AsRef<Path>) -> RepoResult<Self> {
        Self::init_with_config(work_tree, RepoConfig::default())
    }

    /// Create (or re-initialize) a repository. `HEAD` is rewritten to point
    /// at `config.head_branch`; existing objects are kept. The config file
    /// is written when `config` differs from the defaults and removed when
    /// it does not, so a later `open` sees exactly `config`.
    pub fn init_with_config(work_tree: impl AsRef<Path>, config: RepoConfig) -> RepoResult<Self> {
        config.validate()?;
        let work_tree = work_tree.as_ref().to_path_buf();
        let repo_dir = work_tree.join(REPO_DIR);

        fs::create_dir_all(repo_dir.join(REFS_DIR).join("heads"))?;
        let store = LooseObjectStore::init(repo_dir.join(OBJECTS_DIR), config.store_options())?;
        fs::write(
            repo_dir.join(HEAD_FILE),
            format!("ref: refs/heads/{}\n", config.head_branch),
        )?;
        if config == RepoConfig::default() {
            RepoConfig::remove(&repo_dir)?;
        } else {
            config.save(&repo_dir)?;
        }

        info!(path = %repo_dir.display(), "initialized repository");
        Ok(Self {
            work_tree,
            repo_dir,
            config,
            store,
        })
    }

    /// Open an existing repository.
    pub fn open(work_tree: impl AsRef<Path>) -> RepoResult<Self> {
        let work_tree = work_tree.as_ref().to_path_buf();
        let repo_dir = work_tree.join(REPO_DIR);
        if !repo_dir.join(HEAD_FILE).is_file() || !repo_dir.join(OBJECTS_DIR).is_dir() {
            return Err(RepoError::NotARepository(work_tree));
        }
        let config = RepoConfig::load(&repo_dir)?;
        let store =
            LooseObjectStore::with_options(repo_dir.join(OBJECTS_DIR), config.store_options());
        debug!(path = %repo_dir.display(), "opened repository");
        Ok(Self {
            work_tree,
            repo_dir,
            config,
            store,
        })
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn store(&self) -> &LooseObjectStore {
        &self.store
    }

    /// Contents of `HEAD` without the trailing newline.
    pub fn head(&self) -> RepoResult<String> {
        let text = fs::read_to_string(self.repo_dir.join(HEAD_FILE))?;
        Ok(text.trim_end_matches('\n').to_string())
    }

    // ---- Object operations ----

    /// Address of `data` as a blob, storing it when `write` is set.
    pub fn hash_object(&self, data: &[u8], write: bool) -> RepoResult<ObjectId> {
        if write {
            Ok(self.store.write(&Blob::new(data.to_vec()).to_stored_object())?)
        } else {
            Ok(Blob::address(data))
        }
    }

    /// Load any object.
    pub fn read_object(&self, id: &ObjectId) -> RepoResult<StoredObject> {
        Ok(self.store.load(id)?)
    }

    /// Load a tree, failing if `id` names another kind.
    pub fn read_tree(&self, id: &ObjectId) -> RepoResult<Tree> {
        let object = self.store.load(id)?;
        object.expect_kind(id, &ObjectKind::Tree)?;
        Ok(Tree::from_stored_object(&object)?)
    }

    /// Snapshot the working tree and return the root tree address.
    pub fn write_tree(&self) -> RepoResult<ObjectId> {
        snapshot::write_tree(&self.store, &self.work_tree, &self.config)
    }

    /// Store a commit for `tree` and return its address. `tree` is not
    /// required to exist.
    pub fn commit_tree(&self, tree: ObjectId, message: &str) -> RepoResult<ObjectId> {
        let id = self.store.write(&Commit::new(tree, message).to_stored_object())?;
        info!(commit = %id, tree = %tree, "commit written");
        Ok(id)
    }

    /// Materialize a tree, or a commit's root tree, under `dest`.
    pub fn checkout(&self, id: &ObjectId, dest: &Path) -> RepoResult<CheckoutStats> {
        let object = self.store.load(id)?;
        let tree_id = match object.kind {
            ObjectKind::Tree => *id,
            ObjectKind::Commit => Commit::decode(&object.data)?.tree,
            other => {
                return Err(StoreError::KindMismatch {
                    id: *id,
                    expected: "tree or commit".into(),
                    actual: other.to_string(),
                }
                .into())
            }
        };
        checkout_tree(&self.store, &tree_id, dest)
    }

    // ---- Bulk export/import ----

    /// Copy a repository: `HEAD`, `refs/`, the config file, and every
    /// object. Objects are re-read (and verified) from the source and
    /// written atomically into the destination.
    pub fn clone_from(
        src_work_tree: impl AsRef<Path>,
        dst_work_tree: impl AsRef<Path>,
    ) -> RepoResult<(Self, CloneReport)> {
        let source = Self::open(src_work_tree)?;
        let dest = Self::init_with_config(dst_work_tree, source.config.clone())?;

        fs::copy(source.repo_dir.join(HEAD_FILE), dest.repo_dir.join(HEAD_FILE))?;
        let refs = copy_tree(&source.repo_dir.join(REFS_DIR), &dest.repo_dir.join(REFS_DIR))?;
        let objects = dest.store.import_from(&source.store)?;

        info!(
            from = %source.work_tree.display(),
            to = %dest.work_tree.display(),
            objects,
            refs,
            "clone complete"
        );
        Ok((dest, CloneReport { objects, refs }))
    }
}

/// Recursively copy regular files from `src` to `dst`. Returns the number of
/// files copied.
fn copy_tree(src: &Path, dst: &Path) -> RepoResult<usize> {
    if !src.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
