use std::{fmt, sync::Arc};

use afl_db::repositories::progress;
use afl_progress::{
    CardStatus, Clock, DailyPlan, Durability, PersistError, ProgressKey, ProgressRepository,
    ProgressService, ProgressStats, ReviewOutcome,
};
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{error::ApiError, metrics};

pub type SharedClock = Arc<dyn Clock>;
pub type SharedRepository = Arc<dyn ProgressRepository>;
pub type LocalProgress = ProgressService<SharedRepository, SharedClock>;

/// Where the server keeps progress.
///
/// `Local` wraps the synchronous [`ProgressService`] over a memory or file
/// repository and runs it on the blocking pool. `Postgres` keeps one row per
/// learner and language and locks it for every write.
#[derive(Clone)]
pub enum ProgressBackend {
    Local {
        service: Arc<LocalProgress>,
        label: &'static str,
    },
    Postgres(PostgresProgress),
}

#[derive(Clone)]
pub struct PostgresProgress {
    pool: PgPool,
    clock: SharedClock,
}

impl fmt::Debug for ProgressBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProgressBackend").field(&self.label()).finish()
    }
}

impl ProgressBackend {
    pub fn local(
        repository: impl ProgressRepository + 'static,
        clock: SharedClock,
        label: &'static str,
    ) -> Self {
        let repository: SharedRepository = Arc::new(repository);
        Self::Local {
            service: Arc::new(ProgressService::new(repository, clock)),
            label,
        }
    }

    pub const fn postgres(pool: PgPool, clock: SharedClock) -> Self {
        Self::Postgres(PostgresProgress { pool, clock })
    }

    /// Storage kind, used as the `backend` metric label.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Local { label, .. } => *label,
            Self::Postgres(_) => "postgres",
        }
    }

    pub async fn snapshot(&self, key: ProgressKey) -> Result<ProgressStats, ApiError> {
        match self {
            Self::Local { service, .. } => {
                run_local(service, move |service| service.snapshot(&key)).await
            }
            Self::Postgres(pg) => pg.read(&key).await,
        }
    }

    pub async fn record_review(
        &self,
        key: ProgressKey,
        card_id: String,
        correct: bool,
    ) -> Result<ReviewOutcome, ApiError> {
        let outcome = match self {
            Self::Local { service, .. } => {
                run_local(service, move |service| {
                    service.record_review(&key, &card_id, correct)
                })
                .await?
            }
            Self::Postgres(pg) => {
                let (card, stats) = pg
                    .mutate(&key, |stats, today| {
                        stats.record_review(&card_id, correct, today).clone()
                    })
                    .await?;
                ReviewOutcome {
                    card,
                    stats,
                    durability: Durability::Persisted,
                }
            }
        };

        metrics::record_review_event(correct);
        self.track_durability(&outcome.durability);
        Ok(outcome)
    }

    pub async fn due_cards(
        &self,
        key: ProgressKey,
        candidates: Vec<String>,
    ) -> Result<Vec<String>, ApiError> {
        match self {
            Self::Local { service, .. } => {
                run_local(service, move |service| service.due_cards(&key, &candidates)).await
            }
            Self::Postgres(pg) => {
                let today = pg.clock.today();
                Ok(pg.read(&key).await?.due_cards(&candidates, today))
            }
        }
    }

    pub async fn hard_cards(
        &self,
        key: ProgressKey,
        candidates: Vec<String>,
    ) -> Result<Vec<String>, ApiError> {
        match self {
            Self::Local { service, .. } => {
                run_local(service, move |service| service.hard_cards(&key, &candidates)).await
            }
            Self::Postgres(pg) => Ok(pg.read(&key).await?.hard_cards(&candidates)),
        }
    }

    pub async fn card_status(
        &self,
        key: ProgressKey,
        card_id: String,
    ) -> Result<CardStatus, ApiError> {
        match self {
            Self::Local { service, .. } => {
                run_local(service, move |service| service.card_status(&key, &card_id)).await
            }
            Self::Postgres(pg) => Ok(pg.read(&key).await?.card_status(&card_id)),
        }
    }

    pub async fn daily_plan(
        &self,
        key: ProgressKey,
        candidates: Vec<String>,
        session_size: usize,
    ) -> Result<DailyPlan, ApiError> {
        match self {
            Self::Local { service, .. } => {
                run_local(service, move |service| {
                    service.daily_plan(&key, &candidates, session_size)
                })
                .await
            }
            Self::Postgres(pg) => {
                let today = pg.clock.today();
                Ok(pg
                    .read(&key)
                    .await?
                    .daily_plan(&candidates, session_size, today))
            }
        }
    }

    pub async fn reset(&self, key: ProgressKey) -> Result<Durability, ApiError> {
        let durability = match self {
            Self::Local { service, .. } => {
                run_local(service, move |service| service.reset_progress(&key)).await?
            }
            Self::Postgres(pg) => {
                pg.mutate(&key, |stats, _| *stats = ProgressStats::default())
                    .await?;
                Durability::Persisted
            }
        };

        self.track_durability(&durability);
        Ok(durability)
    }

    fn track_durability(&self, durability: &Durability) {
        if !durability.is_persisted() {
            metrics::record_persist_failure(self.label());
        }
    }
}

/// Run a progress operation on the blocking pool; the service takes std mutexes and may touch disk.
async fn run_local<T, F>(service: &Arc<LocalProgress>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&LocalProgress) -> Result<T, PersistError> + Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|err| ApiError::Internal(format!("progress task failed: {err}")))?
        .map_err(ApiError::from)
}

impl PostgresProgress {
    /// Current stats for `key`, persisting a decayed streak first if needed.
    async fn read(&self, key: &ProgressKey) -> Result<ProgressStats, ApiError> {
        let today = self.clock.today();
        let Some(stats) = progress::find_stats(&self.pool, key).await? else {
            return Ok(ProgressStats::default());
        };

        let mut decayed = stats.clone();
        if decayed.decay_streak(today) {
            let ((), stats) = self.mutate(key, |_, _| ()).await?;
            return Ok(stats);
        }
        Ok(stats)
    }

    /// Apply `f` to the locked row for `key` and write the result back in one transaction.
    ///
    /// The stale-streak decay is applied before `f` runs.
    async fn mutate<T>(
        &self,
        key: &ProgressKey,
        f: impl FnOnce(&mut ProgressStats, NaiveDate) -> T,
    ) -> Result<(T, ProgressStats), ApiError> {
        let today = self.clock.today();
        let mut tx = self.pool.begin().await?;

        progress::ensure_record(&mut *tx, key).await?;
        let mut stats = progress::lock_stats(&mut *tx, key).await?;
        stats.decay_streak(today);
        let output = f(&mut stats, today);
        progress::upsert_stats(&mut *tx, key, &stats).await?;

        tx.commit().await?;
        tracing::debug!(key = %key, total_reviews = stats.total_reviews, "progress saved");
        Ok((output, stats))
    }
}
