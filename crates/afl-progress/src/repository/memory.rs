use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use super::{ProgressRepository, decode};
use crate::{PersistError, ProgressKey, ProgressStats};

/// Keeps serialized records in process memory.
///
/// Records go through the same JSON encoding as on-disk storage, so anything
/// this repository accepts also survives a real round trip.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: Mutex<HashMap<ProgressKey, String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// The serialized record stored under `key`.
    pub fn raw(&self, key: &ProgressKey) -> Result<Option<String>, PersistError> {
        Ok(self.records()?.get(key).cloned())
    }

    /// Store an already serialized record, e.g. one exported from the browser client.
    pub fn insert_raw(&self, key: ProgressKey, json: impl Into<String>) -> Result<(), PersistError> {
        self.records()?.insert(key, json.into());
        Ok(())
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<ProgressKey, String>>, PersistError> {
        self.records
            .lock()
            .map_err(|_| PersistError::Unavailable("memory repository lock poisoned".to_string()))
    }
}

impl ProgressRepository for MemoryRepository {
    fn load(&self, key: &ProgressKey) -> Result<Option<ProgressStats>, PersistError> {
        self.records()?
            .get(key)
            .map(|raw| decode(key, raw))
            .transpose()
    }

    fn save(&self, key: &ProgressKey, stats: &ProgressStats) -> Result<(), PersistError> {
        let json = serde_json::to_string(stats).map_err(PersistError::Serialize)?;
        self.records()?.insert(key.clone(), json);
        Ok(())
    }
}
