//! Repository layer for Cairn.
//!
//! Wraps a [`LooseObjectStore`](cairn_store::LooseObjectStore) in the on-disk
//! repository layout (`HEAD`, `objects/`, `refs/`), and provides the
//! filesystem-facing operations built on the core codecs: snapshotting a
//! working directory into trees, materializing a tree back onto disk, and
//! cloning a repository's objects.
//!
//! # Key Types
//!
//! - [`Repository`] -- an opened repository with an explicit root
//! - [`RepoConfig`] -- settings read from `cairn.toml`
//! - [`TreeLayout`] -- nested (one tree per directory) or flat snapshots

pub mod checkout;
pub mod config;
pub mod error;
pub mod repository;
pub mod snapshot;

pub use checkout::{checkout_tree, CheckoutStats};
pub use config::{RepoConfig, TreeLayout};
pub use error::{RepoError, RepoResult};
pub use repository::{CloneReport, Repository, REPO_DIR};
pub use snapshot::write_tree;
