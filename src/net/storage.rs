//! Persistence of match snapshots.
//!
//! The authoritative master reads and writes whole snapshots keyed by match
//! id. Two backends ship with the crate:
//! - `InMemoryStorage`: a locked map, the default
//! - `FlatFileStorage`: one JSON file per match in a directory

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::core::{StateSnapshot, StorageError};
use crate::game::GameData;

/// Snapshot persistence keyed by match id.
pub trait Storage<G: Clone>: Send + Sync {
    /// Load a match. `Ok(None)` if it was never stored.
    fn get(&self, match_id: &str) -> Result<Option<StateSnapshot<G>>, StorageError>;

    /// Store a match, replacing any previous snapshot.
    fn set(&self, match_id: &str, state: &StateSnapshot<G>) -> Result<(), StorageError>;

    /// Ids of every stored match, sorted.
    fn list(&self) -> Result<Vec<String>, StorageError>;
}

/// Snapshots held in memory.
#[derive(Debug)]
pub struct InMemoryStorage<G: Clone> {
    matches: Mutex<FxHashMap<String, StateSnapshot<G>>>,
}

impl<G: Clone> InMemoryStorage<G> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matches: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<G: Clone> Default for InMemoryStorage<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GameData> Storage<G> for InMemoryStorage<G> {
    fn get(&self, match_id: &str) -> Result<Option<StateSnapshot<G>>, StorageError> {
        let matches = self.matches.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(matches.get(match_id).cloned())
    }

    fn set(&self, match_id: &str, state: &StateSnapshot<G>) -> Result<(), StorageError> {
        let mut matches = self.matches.lock().unwrap_or_else(PoisonError::into_inner);
        matches.insert(match_id.to_string(), state.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let matches = self.matches.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = matches.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Snapshots stored as `<dir>/<match_id>.json`.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// reader never observes a half-written snapshot.
#[derive(Debug)]
pub struct FlatFileStorage<G> {
    dir: PathBuf,
    _game: PhantomData<fn() -> G>,
}

impl<G> FlatFileStorage<G> {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            _game: PhantomData,
        })
    }

    /// Directory holding the snapshots.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, match_id: &str) -> Result<PathBuf, StorageError> {
        let valid = !match_id.is_empty()
            && match_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidMatchId(match_id.to_string()));
        }
        Ok(self.dir.join(format!("{match_id}.json")))
    }
}

impl<G: GameData + DeserializeOwned> Storage<G> for FlatFileStorage<G> {
    fn get(&self, match_id: &str) -> Result<Option<StateSnapshot<G>>, StorageError> {
        let path = self.path_for(match_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn set(&self, match_id: &str, state: &StateSnapshot<G>) -> Result<(), StorageError> {
        let path = self.path_for(match_id)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(state)?)?;
        fs::rename(&tmp, &path)?;
        trace!(match_id, path = %path.display(), "snapshot written");
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
