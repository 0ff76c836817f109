//! Progress for many learners and languages behind per-key locks.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    CardProgress, CardStatus, Clock, DailyPlan, Durability, PersistError, ProgressKey,
    ProgressRepository, ProgressStats, ProgressStore,
};

type SharedStore<R, C> = Arc<Mutex<ProgressStore<R, C>>>;

/// Result of recording a review through [`ProgressService`].
#[derive(Debug)]
pub struct ReviewOutcome {
    pub card: CardProgress,
    pub stats: ProgressStats,
    pub durability: Durability,
}

/// Open stores kept by [`ProgressService::new`] before idle ones are dropped.
pub const DEFAULT_STORE_CAPACITY: usize = 1024;

/// Serves progress for any number of keys.
///
/// Each key gets one [`ProgressStore`] behind its own mutex, opened on first
/// use. Operations on one key run one at a time, so concurrent reviews never
/// start from the same snapshot; different keys never contend beyond the brief
/// registry lookup.
///
/// Once more than `capacity` stores are open, stores that are idle and fully
/// persisted are closed; they reopen from the repository on next use. A store
/// whose last write failed holds the only copy of its state and stays open.
#[derive(Debug)]
pub struct ProgressService<R, C> {
    repository: R,
    clock: C,
    capacity: usize,
    stores: Mutex<HashMap<ProgressKey, SharedStore<R, C>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic inside a closure leaves the last completed state; keep serving it.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R, C> ProgressService<R, C>
where
    R: ProgressRepository + Clone,
    C: Clock + Clone,
{
    pub fn new(repository: R, clock: C) -> Self {
        Self::with_capacity(repository, clock, DEFAULT_STORE_CAPACITY)
    }

    /// Like [`ProgressService::new`], keeping about `capacity` stores open.
    pub fn with_capacity(repository: R, clock: C, capacity: usize) -> Self {
        Self {
            repository,
            clock,
            capacity: capacity.max(1),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` with exclusive access to the store for `key`.
    pub fn with_store<T>(
        &self,
        key: &ProgressKey,
        f: impl FnOnce(&mut ProgressStore<R, C>) -> T,
    ) -> Result<T, PersistError> {
        let store = self.store(key)?;
        let mut guard = lock(&store);
        Ok(f(&mut guard))
    }

    pub fn record_review(
        &self,
        key: &ProgressKey,
        card_id: &str,
        correct: bool,
    ) -> Result<ReviewOutcome, PersistError> {
        self.with_store(key, |store| {
            let durability = store.record_review(card_id, correct);
            let stats = store.snapshot();
            let card = stats.card_progress[card_id].clone();
            ReviewOutcome {
                card,
                stats,
                durability,
            }
        })
    }

    pub fn snapshot(&self, key: &ProgressKey) -> Result<ProgressStats, PersistError> {
        self.with_store(key, ProgressStore::snapshot)
    }

    pub fn due_cards<S: AsRef<str>>(
        &self,
        key: &ProgressKey,
        candidates: &[S],
    ) -> Result<Vec<String>, PersistError> {
        self.with_store(key, |store| store.due_cards(candidates))
    }

    pub fn hard_cards<S: AsRef<str>>(
        &self,
        key: &ProgressKey,
        candidates: &[S],
    ) -> Result<Vec<String>, PersistError> {
        self.with_store(key, |store| store.hard_cards(candidates))
    }

    pub fn card_status(&self, key: &ProgressKey, card_id: &str) -> Result<CardStatus, PersistError> {
        self.with_store(key, |store| store.card_status(card_id))
    }

    pub fn daily_plan<S: AsRef<str>>(
        &self,
        key: &ProgressKey,
        candidates: &[S],
        session_size: usize,
    ) -> Result<DailyPlan, PersistError> {
        self.with_store(key, |store| store.daily_plan(candidates, session_size))
    }

    pub fn reset_progress(&self, key: &ProgressKey) -> Result<Durability, PersistError> {
        self.with_store(key, ProgressStore::reset_progress)
    }

    /// Number of keys with an open store.
    pub fn open_stores(&self) -> usize {
        lock(&self.stores).len()
    }

    fn store(&self, key: &ProgressKey) -> Result<SharedStore<R, C>, PersistError> {
        let mut stores = lock(&self.stores);
        if let Some(store) = stores.get(key) {
            return Ok(Arc::clone(store));
        }

        if stores.len() >= self.capacity {
            close_idle(&mut stores);
        }

        let store = ProgressStore::open(key.clone(), self.repository.clone(), self.clock.clone())?;
        let store = Arc::new(Mutex::new(store));
        stores.insert(key.clone(), Arc::clone(&store));
        Ok(store)
    }
}

/// Drop stores nobody is using whose state is already in the repository.
///
/// Runs under the registry lock, so a store with a strong count of one cannot
/// be picked up concurrently.
fn close_idle<R, C>(stores: &mut HashMap<ProgressKey, SharedStore<R, C>>)
where
    R: ProgressRepository,
    C: Clock,
{
    let before = stores.len();
    stores.retain(|_, store| Arc::strong_count(store) > 1 || lock(store).last_failure().is_some());
    tracing::debug!(closed = before - stores.len(), open = stores.len(), "closed idle stores");
}
