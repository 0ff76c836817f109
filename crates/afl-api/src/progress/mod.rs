pub mod backend;
pub mod model;
mod routes;

pub use backend::{PostgresProgress, ProgressBackend, SharedClock};
pub use routes::routes;
