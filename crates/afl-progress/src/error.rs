use std::path::PathBuf;

use thiserror::Error;

/// Failure to read or write a progress record.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize progress: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("stored progress for {key} is unreadable: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("progress storage unavailable: {0}")]
    Unavailable(String),
}
