// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Controller's file index: a map from filename to its replication
//! state. Owned exclusively by the coordinator task — see
//! [`crate::coordinator`] — so its methods are plain synchronous mutation,
//! no internal locking.

use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    StoreInProgress,
    StoreComplete,
    RemoveInProgress,
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub size: u64,
    pub state: FileState,
    pub replicas: BTreeSet<u16>,
}

/// A filename appears with at most one entry, which this type upholds
/// simply by being a `HashMap`.
#[derive(Debug, Default)]
pub struct FileIndex {
    entries: HashMap<String, FileEntry>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.entries.get(name)
    }

    /// Begins a store: inserts a fresh `StoreInProgress` entry. Caller must
    /// have already checked `!contains(name)`.
    pub fn begin_store(&mut self, name: String, size: u64) {
        self.entries.insert(
            name,
            FileEntry {
                size,
                state: FileState::StoreInProgress,
                replicas: BTreeSet::new(),
            },
        );
    }

    /// Completes a store, setting `replicas` and transitioning to
    /// `StoreComplete`.
    pub fn complete_store(&mut self, name: &str, replicas: BTreeSet<u16>) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.replicas = replicas;
            entry.state = FileState::StoreComplete;
        }
    }

    /// Abandons an in-progress store on timeout.
    pub fn abandon_store(&mut self, name: &str) {
        self.entries.remove(name);
    }

    /// Marks an entry `RemoveInProgress`.
    pub fn begin_remove(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.state = FileState::RemoveInProgress;
        }
    }

    /// Deletes the entry entirely on remove completion.
    pub fn complete_remove(&mut self, name: &str) {
        self.entries.remove(name);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Every name whose state is `StoreComplete`, in unspecified order.
    pub fn list_complete(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.state == FileState::StoreComplete)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_index_has_no_entry() {
        let idx = FileIndex::new();
        assert!(!idx.contains("a"));
    }

    #[test]
    fn complete_store_sets_replicas_and_state() {
        let mut idx = FileIndex::new();
        idx.begin_store("a".to_string(), 5);
        assert_eq!(idx.get("a").unwrap().state, FileState::StoreInProgress);

        idx.complete_store("a", BTreeSet::from([8001, 8002]));
        let entry = idx.get("a").unwrap();
        assert_eq!(entry.state, FileState::StoreComplete);
        assert_eq!(entry.replicas, BTreeSet::from([8001, 8002]));
    }

    #[test]
    fn abandon_store_removes_entry() {
        let mut idx = FileIndex::new();
        idx.begin_store("a".to_string(), 5);
        idx.abandon_store("a");
        assert!(!idx.contains("a"));
    }

    #[test]
    fn remove_in_progress_survives_until_complete_remove() {
        let mut idx = FileIndex::new();
        idx.begin_store("a".to_string(), 5);
        idx.complete_store("a", BTreeSet::from([8001]));
        idx.begin_remove("a");
        assert_eq!(idx.get("a").unwrap().state, FileState::RemoveInProgress);
        idx.complete_remove("a");
        assert!(!idx.contains("a"));
    }

    #[test]
    fn list_complete_excludes_in_progress_entries() {
        let mut idx = FileIndex::new();
        idx.begin_store("a".to_string(), 5);
        idx.begin_store("b".to_string(), 9);
        idx.complete_store("b", BTreeSet::from([8001]));
        assert_eq!(idx.list_complete(), vec!["b".to_string()]);
    }
}
