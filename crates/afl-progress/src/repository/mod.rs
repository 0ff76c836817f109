// Repositories persist a whole `ProgressStats` per key. A record that was
// never saved loads as `None`; callers start from the empty default.

mod file;
mod memory;

use std::sync::Arc;

pub use file::JsonFileRepository;
pub use memory::MemoryRepository;

use crate::{PersistError, ProgressKey, ProgressStats};

/// Durable sink for progress records.
pub trait ProgressRepository: Send + Sync {
    /// Load the record stored under `key`, if any.
    fn load(&self, key: &ProgressKey) -> Result<Option<ProgressStats>, PersistError>;

    /// Replace the record stored under `key` with `stats`.
    fn save(&self, key: &ProgressKey, stats: &ProgressStats) -> Result<(), PersistError>;
}

impl<R: ProgressRepository + ?Sized> ProgressRepository for Arc<R> {
    fn load(&self, key: &ProgressKey) -> Result<Option<ProgressStats>, PersistError> {
        (**self).load(key)
    }

    fn save(&self, key: &ProgressKey, stats: &ProgressStats) -> Result<(), PersistError> {
        (**self).save(key, stats)
    }
}

impl<R: ProgressRepository + ?Sized> ProgressRepository for Box<R> {
    fn load(&self, key: &ProgressKey) -> Result<Option<ProgressStats>, PersistError> {
        (**self).load(key)
    }

    fn save(&self, key: &ProgressKey, stats: &ProgressStats) -> Result<(), PersistError> {
        (**self).save(key, stats)
    }
}

fn decode(key: &ProgressKey, raw: &str) -> Result<ProgressStats, PersistError> {
    serde_json::from_str(raw).map_err(|source| PersistError::Deserialize {
        key: key.to_string(),
        source,
    })
}
