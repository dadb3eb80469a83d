// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording collection with persistence.
//!
//! The whole collection lives under one key of the backing store as a JSON
//! array and is rewritten after every mutation. Persistence is best-effort:
//! failures are logged and the in-memory collection stays authoritative.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::Recording;
use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Keyed collection of finalized recordings
pub struct RecordingStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
    recordings: HashMap<String, Recording>,
}

impl RecordingStore {
    /// Create a store over `backend` and load whatever `key` holds
    pub fn new(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let mut store = Self {
            backend,
            key: key.into(),
            recordings: HashMap::new(),
        };
        store.load_all();
        store
    }

    /// Storage key the collection is persisted under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the in-memory collection with the persisted one.
    ///
    /// Returns the number of recordings loaded; a missing or unreadable
    /// entry leaves the store empty.
    pub fn load_all(&mut self) -> usize {
        self.recordings.clear();

        match self.read_persisted() {
            Ok(recordings) => {
                for recording in recordings {
                    self.recordings.insert(recording.id.clone(), recording);
                }
                debug!(count = self.recordings.len(), key = %self.key, "recordings loaded");
            }
            Err(e) => warn!(error = %e, key = %self.key, "failed to load recordings"),
        }
        self.recordings.len()
    }

    /// Persist the whole collection. Returns false if the write failed.
    pub fn save_all(&mut self) -> bool {
        match self.write_persisted() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, key = %self.key, "failed to save recordings");
                false
            }
        }
    }

    fn read_persisted(&self) -> Result<Vec<Recording>, StorageError> {
        match self.backend.get(&self.key)? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_persisted(&mut self) -> Result<(), StorageError> {
        let text = serde_json::to_string(&self.list())?;
        self.backend.set(&self.key, &text)
    }

    /// All recordings, newest first
    pub fn list(&self) -> Vec<Recording> {
        let mut recordings: Vec<Recording> = self.recordings.values().cloned().collect();
        recordings.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        recordings
    }

    /// Look up a recording
    pub fn get(&self, id: &str) -> Option<&Recording> {
        self.recordings.get(id)
    }

    /// Check if a recording exists
    pub fn contains(&self, id: &str) -> bool {
        self.recordings.contains_key(id)
    }

    /// Number of recordings
    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    /// Add (or replace by id) a recording and persist
    pub fn insert(&mut self, recording: Recording) {
        self.recordings.insert(recording.id.clone(), recording);
        self.save_all();
    }

    /// Remove a recording and persist
    pub fn delete(&mut self, id: &str) -> bool {
        if self.recordings.remove(id).is_none() {
            return false;
        }
        self.save_all();
        true
    }

    /// Rename a recording and persist. Blank names are rejected.
    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.recordings.get_mut(id) {
            Some(recording) => {
                recording.name = name.to_string();
            }
            None => return false,
        }
        self.save_all();
        true
    }

    /// Remove every recording and persist
    pub fn clear(&mut self) {
        self.recordings.clear();
        self.save_all();
    }
}
