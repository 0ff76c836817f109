use std::path::PathBuf;

use serde::Deserialize;

/// Deployment environment, selects logging format and defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Where progress records are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    File(PathBuf),
    Memory,
}

/// Server configuration, read from environment variables.
///
/// | Variable | Default |
/// |---|---|
/// | `ENV` | `development` |
/// | `HOST` | `0.0.0.0` |
/// | `PORT` | `3000` |
/// | `DATABASE_URL` | unset |
/// | `DB_MAX_CONNECTIONS` | `10` |
/// | `PROGRESS_DATA_DIR` | unset |
/// | `ALLOWED_ORIGINS` | `http://localhost:8080` |
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database_url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    pub progress_data_dir: Option<PathBuf>,
    /// Comma-separated list of origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_db_max_connections() -> u32 {
    10
}

fn default_allowed_origins() -> String {
    "http://localhost:8080".to_string()
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Build the config from explicit `(NAME, value)` pairs instead of the process environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// A database takes precedence over a data directory; with neither, records live in memory.
    pub fn storage(&self) -> StorageConfig {
        match (&self.database_url, &self.progress_data_dir) {
            (Some(database_url), _) if !database_url.is_empty() => StorageConfig::Postgres {
                database_url: database_url.clone(),
                max_connections: self.db_max_connections,
            },
            (_, Some(dir)) if !dir.as_os_str().is_empty() => StorageConfig::File(dir.clone()),
            _ => StorageConfig::Memory,
        }
    }
}
