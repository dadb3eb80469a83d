// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Directory-backed key-value store.
//!
//! Each key maps to `<dir>/<key>.json`. Writes go to a temporary file first
//! and are renamed into place. An optional quota bounds the total size of
//! the entry files in the directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::KeyValueStore;
use crate::error::StorageError;

/// File store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStore {
    /// Open (creating if needed) a store directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory: {:?}", dir))?;
        Ok(Self {
            dir,
            quota_bytes: None,
        })
    }

    /// Refuse writes that would push the entries past `quota_bytes`
    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Total size of the entry files, in bytes
    pub fn used_bytes(&self) -> io::Result<usize> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                total += fs::metadata(&path)?.len() as usize;
            }
        }
        Ok(total)
    }

    fn check_quota(&self, key: &str, path: &Path, value: &str) -> Result<(), StorageError> {
        let Some(quota) = self.quota_bytes else {
            return Ok(());
        };
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        let existing = match fs::metadata(path) {
            Ok(meta) => meta.len() as usize,
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(io_err(e)),
        };
        let others = self.used_bytes().map_err(io_err)?.saturating_sub(existing);
        let available = quota.saturating_sub(others);
        let needed = value.len();
        if needed > available {
            return Err(StorageError::QuotaExceeded { needed, available });
        }
        Ok(())
    }

    /// Directory holding the entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        self.check_quota(key, &path, value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|source| StorageError::Io {
                key: key.to_string(),
                source,
            })
    }
}
