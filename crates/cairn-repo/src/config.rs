use std::fs;
use std::io;
use std::path::Path;

use cairn_store::LooseOptions;
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// How a working directory is encoded into trees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeLayout {
    /// One tree per directory, subdirectories referenced by tree address.
    #[default]
    Nested,
    /// A single tree whose entry names are `/`-separated relative paths.
    Flat,
}

/// Repository settings, stored as `cairn.toml` inside the repository
/// directory. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Branch named by `HEAD` on init.
    pub head_branch: String,
    /// zlib level for new objects (0-10).
    pub compression_level: u8,
    /// Re-hash objects on read.
    pub verify_on_read: bool,
    /// Snapshot tree layout.
    pub layout: TreeLayout,
    /// File or directory names skipped at any depth by snapshots. The
    /// repository directory itself is always skipped.
    pub ignore: Vec<String>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            head_branch: "main".into(),
            compression_level: 6,
            verify_on_read: true,
            layout: TreeLayout::Nested,
            ignore: Vec::new(),
        }
    }
}

impl RepoConfig {
    /// File name inside the repository directory.
    pub const FILE_NAME: &'static str = "cairn.toml";

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> RepoResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| RepoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> RepoResult<String> {
        toml::to_string_pretty(self).map_err(|e| RepoError::Config(e.to_string()))
    }

    /// Load `cairn.toml` from `repo_dir`, falling back to defaults when the
    /// file does not exist.
    pub fn load(repo_dir: &Path) -> RepoResult<Self> {
        match fs::read_to_string(repo_dir.join(Self::FILE_NAME)) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, repo_dir: &Path) -> RepoResult<()> {
        self.validate()?;
        fs::write(repo_dir.join(Self::FILE_NAME), self.to_toml_string()?)?;
        Ok(())
    }

    /// Delete `cairn.toml` from `repo_dir` if present.
    pub fn remove(repo_dir: &Path) -> RepoResult<()> {
        match fs::remove_file(repo_dir.join(Self::FILE_NAME)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate(&self) -> RepoResult<()> {
        if self.compression_level > 10 {
            return Err(RepoError::Config(format!(
                "compression_level must be 0-10, got {}",
                self.compression_level
            )));
        }
        if self.head_branch.is_empty() || self.head_branch.contains(['\n', ' ']) {
            return Err(RepoError::Config(format!(
                "invalid head_branch {:?}",
                self.head_branch
            )));
        }
        Ok(())
    }

    /// Options for the loose object store.
    pub fn store_options(&self) -> LooseOptions {
        LooseOptions {
            compression_level: self.compression_level,
            verify_on_read: self.verify_on_read,
        }
    }
}
