//! Persistent metadata cache.
//!
//! Extracted tags are kept in a TOML file keyed by path so that start-up
//! does not have to probe every file again. Entries added or changed since
//! the last flush are *pending*; the registry never evicts a track with a
//! pending entry.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Metadata;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    tracks: BTreeMap<String, Metadata>,
}

#[derive(Debug, Default)]
pub struct MetadataCache {
    file: Option<PathBuf>,
    entries: BTreeMap<PathBuf, Metadata>,
    pending: BTreeSet<PathBuf>,
}

impl MetadataCache {
    /// A cache that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache stored at `file`. A missing file yields an empty cache.
    pub fn load(file: PathBuf) -> Result<Self> {
        let entries = match fs::read_to_string(&file) {
            Ok(text) => {
                let parsed: CacheFile =
                    toml::from_str(&text).map_err(|e| Error::Cache(e.to_string()))?;
                parsed
                    .tracks
                    .into_iter()
                    .map(|(path, meta)| (PathBuf::from(path), meta))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::io(file, e)),
        };

        Ok(Self {
            file: Some(file),
            entries,
            pending: BTreeSet::new(),
        })
    }

    pub fn get(&self, path: &Path) -> Option<&Metadata> {
        self.entries.get(path)
    }

    #[cfg(test)]
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, path: PathBuf, meta: Metadata) {
        if self.entries.get(&path) == Some(&meta) {
            return;
        }
        self.pending.insert(path.clone());
        self.entries.insert(path, meta);
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains(path)
    }

    /// Write the cache out and clear the pending set. An in-memory cache
    /// just forgets what was pending.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(file) = &self.file {
            if !self.pending.is_empty() || !file.exists() {
                let out = CacheFile {
                    tracks: self
                        .entries
                        .iter()
                        .map(|(p, m)| (p.to_string_lossy().into_owned(), m.clone()))
                        .collect(),
                };
                let text = toml::to_string(&out).map_err(|e| Error::Cache(e.to_string()))?;
                if let Some(dir) = file.parent() {
                    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
                }
                fs::write(file, text).map_err(|e| Error::io(file.clone(), e))?;
            }
        }
        self.pending.clear();
        Ok(())
    }
}
