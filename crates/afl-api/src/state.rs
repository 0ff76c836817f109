use std::sync::Arc;

use afl_progress::{JsonFileRepository, MemoryRepository, SystemClock};
use anyhow::Context;

use crate::{
    ApiConfig,
    config::{Environment, StorageConfig},
    progress::{ProgressBackend, SharedClock},
};

#[derive(Clone, Debug)]
pub struct ApiState {
    pub backend: ProgressBackend,
    pub environment: Environment,
}

impl ApiState {
    /// Open the storage backend selected by `config`.
    ///
    /// With a database URL the schema is created or migrated before serving.
    pub async fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let clock: SharedClock = Arc::new(SystemClock);

        let backend = match config.storage() {
            StorageConfig::Postgres {
                database_url,
                max_connections,
            } => {
                let pool = afl_db::create_pool(&database_url, max_connections).await?;
                afl_db::ensure_db_and_migrate(&database_url, &pool).await?;
                tracing::info!(max_connections, "progress stored in PostgreSQL");
                ProgressBackend::postgres(pool, clock)
            }
            StorageConfig::File(dir) => {
                let repository = JsonFileRepository::new(&dir).with_context(|| {
                    format!("failed to open progress directory {}", dir.display())
                })?;
                tracing::info!(dir = %dir.display(), "progress stored in JSON files");
                ProgressBackend::local(repository, clock, "file")
            }
            StorageConfig::Memory => {
                tracing::warn!(
                    "neither DATABASE_URL nor PROGRESS_DATA_DIR is set, progress is lost on restart"
                );
                ProgressBackend::local(MemoryRepository::new(), clock, "memory")
            }
        };

        Ok(Self::with_backend(backend, config.env.clone()))
    }

    pub const fn with_backend(backend: ProgressBackend, environment: Environment) -> Self {
        Self {
            backend,
            environment,
        }
    }

    /// State backed by a fresh in-memory repository.
    pub fn in_memory(clock: SharedClock) -> Self {
        Self::with_backend(
            ProgressBackend::local(MemoryRepository::new(), clock, "memory"),
            Environment::Development,
        )
    }
}
