//! HTTP interface to practice progress.

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod progress;
pub mod router;
pub mod state;
pub mod tracing;

pub use config::ApiConfig;
pub use progress::ProgressBackend;
pub use state::ApiState;
