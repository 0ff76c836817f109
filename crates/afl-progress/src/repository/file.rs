use std::{
    fs,
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use super::{ProgressRepository, decode};
use crate::{PersistError, ProgressKey, ProgressStats};

/// Stores each record as a pretty-printed JSON file.
///
/// Layout: `<root>/<learner segment>/<language segment>.json`. Ids are hex
/// encoded so any string is a safe path segment; ids too long for a file name
/// are replaced by `h` and the hex SHA-256 of the id. Writes go to a sibling
/// temporary file that is renamed over the record, so readers never observe a
/// half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    root: PathBuf,
}

impl JsonFileRepository {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| PersistError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &ProgressKey) -> PathBuf {
        self.root
            .join(path_segment(&key.learner_id))
            .join(format!("{}.json", path_segment(&key.language_id)))
    }
}

/// Longest id stored under its plain hex encoding.
const MAX_HEX_ID_BYTES: usize = 100;

fn path_segment(id: &str) -> String {
    if id.len() <= MAX_HEX_ID_BYTES {
        hex::encode(id)
    } else {
        // `h` is not a hex digit, so hashed names never collide with encoded ones.
        format!("h{}", hex::encode(Sha256::digest(id.as_bytes())))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ProgressRepository for JsonFileRepository {
    fn load(&self, key: &ProgressKey) -> Result<Option<ProgressStats>, PersistError> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&path).map_err(io_error(&path))?;
        decode(key, &raw).map(Some)
    }

    fn save(&self, key: &ProgressKey, stats: &ProgressStats) -> Result<(), PersistError> {
        let path = self.record_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let json = serde_json::to_string_pretty(stats).map_err(PersistError::Serialize)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(io_error(&staging))?;
        fs::rename(&staging, &path).map_err(io_error(&path))?;

        tracing::trace!(key = %key, path = %path.display(), "progress written");
        Ok(())
    }
}
