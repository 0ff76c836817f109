//! Practice progress tracking for one learner in one language.
//!
//! [`ProgressStore`] owns the review history, streak and aggregate stats of a
//! single learner × language pair and persists the whole record through a
//! [`ProgressRepository`] after every change. [`ProgressService`] serves many
//! pairs at once, serializing access per pair.

pub mod clock;
pub mod error;
pub mod model;
pub mod repository;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::PersistError;
pub use model::{CardProgress, CardStatus, DailyPlan, ProgressKey, ProgressStats};
pub use repository::{JsonFileRepository, MemoryRepository, ProgressRepository};
pub use service::{DEFAULT_STORE_CAPACITY, ProgressService, ReviewOutcome};
pub use store::{Durability, ProgressStore};
