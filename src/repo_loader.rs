use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::Repository;
use tempfile::TempDir;
use tracing::info;

/// A checkout in a temporary directory, removed when dropped.
pub struct ClonedRepo {
    _dir: TempDir,
    path: PathBuf,
}

impl ClonedRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Clone `url` into a fresh temporary directory under `base_dir`
/// (the system temp directory when `None`).
pub fn clone_repo(url: &str, base_dir: Option<&Path>) -> Result<ClonedRepo> {
    let dir = match base_dir {
        Some(base) => {
            std::fs::create_dir_all(base)
                .with_context(|| format!("Failed to create clone directory {}", base.display()))?;
            TempDir::with_prefix_in("repo-", base)?
        }
        None => TempDir::with_prefix("repo-")?,
    };
    let path = dir.path().join("checkout");

    info!(%url, dest = %path.display(), "cloning repository");
    Repository::clone(url, &path).with_context(|| format!("Failed to clone {url}"))?;

    Ok(ClonedRepo { _dir: dir, path })
}
