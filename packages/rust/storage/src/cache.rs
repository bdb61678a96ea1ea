//! Per-creator content cache: one JSON snapshot file per username.

use std::path::{Path, PathBuf};

use creatorlens_shared::{ContentSnapshot, CreatorLensError, Result};

use crate::write_json_atomic;

/// Suffix appended to the username to form a cache file name.
const CACHE_SUFFIX: &str = "-casts.json";

/// Per-creator content cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct ContentCache {
    dir: PathBuf,
}

impl ContentCache {
    /// Open the cache at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| CreatorLensError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `username`'s entry. Fails for names that would escape
    /// the cache directory.
    pub fn path_for(&self, username: &str) -> Result<PathBuf> {
        if username.is_empty()
            || username.contains(['/', '\\'])
            || username.starts_with('.')
        {
            return Err(CreatorLensError::validation(format!(
                "username '{username}' cannot be used as a cache key"
            )));
        }
        Ok(self.dir.join(format!("{username}{CACHE_SUFFIX}")))
    }

    pub fn has(&self, username: &str) -> bool {
        self.path_for(username).is_ok_and(|p| p.is_file())
    }

    pub fn read(&self, username: &str) -> Result<ContentSnapshot> {
        let path = self.path_for(username)?;
        let content =
            std::fs::read_to_string(&path).map_err(|e| CreatorLensError::io(&path, e))?;

        serde_json::from_str(&content).map_err(|e| {
            CreatorLensError::parse(format!("invalid cache entry {}: {e}", path.display()))
        })
    }

    /// Store a whole snapshot, replacing any previous entry.
    pub fn write(&self, username: &str, snapshot: &ContentSnapshot) -> Result<()> {
        let path = self.path_for(username)?;
        write_json_atomic(&path, snapshot)
    }
}
