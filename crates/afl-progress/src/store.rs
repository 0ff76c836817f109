use crate::{
    CardProgress, CardStatus, Clock, DailyPlan, PersistError, ProgressKey, ProgressRepository,
    ProgressStats,
};

/// Whether a change reached the repository.
///
/// A failed write never rolls back the in-memory change; the store keeps
/// serving the updated state and the caller decides how to surface the
/// warning.
#[must_use]
#[derive(Debug)]
pub enum Durability {
    Persisted,
    /// Applied in memory only; the write failed with this error
    Degraded(PersistError),
}

impl Durability {
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }

    /// The write error, if the change was not persisted.
    pub const fn warning(&self) -> Option<&PersistError> {
        match self {
            Self::Persisted => None,
            Self::Degraded(err) => Some(err),
        }
    }
}

/// Review scheduling state for one learner in one language.
///
/// The in-memory stats are authoritative for the lifetime of the store. Each
/// mutation writes the whole record back through the repository.
#[derive(Debug)]
pub struct ProgressStore<R, C> {
    key: ProgressKey,
    stats: ProgressStats,
    repository: R,
    clock: C,
    last_failure: Option<String>,
}

impl<R: ProgressRepository, C: Clock> ProgressStore<R, C> {
    /// Load the record for `key`, or start empty if none exists.
    ///
    /// A stale streak is decayed right away. Fails only when a stored record
    /// exists but cannot be read, so it is never silently overwritten.
    pub fn open(key: ProgressKey, repository: R, clock: C) -> Result<Self, PersistError> {
        let stats = repository.load(&key)?.unwrap_or_default();
        tracing::debug!(key = %key, total_reviews = stats.total_reviews, "progress loaded");

        let mut store = Self {
            key,
            stats,
            repository,
            clock,
            last_failure: None,
        };
        store.refresh_streak();
        Ok(store)
    }

    /// Learner and language this store serves.
    pub const fn key(&self) -> &ProgressKey {
        &self.key
    }

    /// Current stats, with the streak decayed if the learner has been away.
    pub fn snapshot(&mut self) -> ProgressStats {
        self.refresh_streak();
        self.stats.clone()
    }

    /// Record the outcome of one review of `card_id`.
    pub fn record_review(&mut self, card_id: &str, correct: bool) -> Durability {
        let today = self.clock.today();
        let (interval, ease_factor) = {
            let card = self.stats.record_review(card_id, correct, today);
            (card.interval, card.ease_factor)
        };
        tracing::debug!(
            key = %self.key,
            card_id,
            correct,
            interval,
            ease_factor,
            streak = self.stats.streak,
            "review recorded"
        );

        self.persist()
    }

    /// Progress of one card, without decaying the streak.
    pub fn card(&self, card_id: &str) -> Option<&CardProgress> {
        self.stats.card(card_id)
    }

    /// Candidates due today or never reviewed, in input order.
    pub fn due_cards<S: AsRef<str>>(&self, candidates: &[S]) -> Vec<String> {
        self.stats.due_cards(candidates, self.clock.today())
    }

    pub fn hard_cards<S: AsRef<str>>(&self, candidates: &[S]) -> Vec<String> {
        self.stats.hard_cards(candidates)
    }

    pub fn card_status(&self, card_id: &str) -> CardStatus {
        self.stats.card_status(card_id)
    }

    /// Plan today's session over `candidates`. See [`ProgressStats::daily_plan`].
    pub fn daily_plan<S: AsRef<str>>(&self, candidates: &[S], session_size: usize) -> DailyPlan {
        self.stats
            .daily_plan(candidates, session_size, self.clock.today())
    }

    /// Forget everything recorded for this learner and language.
    pub fn reset_progress(&mut self) -> Durability {
        self.stats = ProgressStats::default();
        tracing::info!(key = %self.key, "progress reset");
        self.persist()
    }

    /// Message of the last failed write, cleared by the next successful one.
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    fn refresh_streak(&mut self) {
        if self.stats.decay_streak(self.clock.today()) {
            tracing::debug!(key = %self.key, "streak expired");
            // A failed write is recorded in `last_failure`; readers still get the decayed state.
            let _ = self.persist();
        }
    }

    fn persist(&mut self) -> Durability {
        match self.repository.save(&self.key, &self.stats) {
            Ok(()) => {
                self.last_failure = None;
                Durability::Persisted
            }
            Err(err) => {
                tracing::warn!(key = %self.key, "progress kept in memory only: {err}");
                self.last_failure = Some(err.to_string());
                Durability::Degraded(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use chrono::NaiveDate;

    use super::*;
    use crate::{FixedClock, MemoryRepository};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn key() -> ProgressKey {
        ProgressKey::new("learner", "yoruba")
    }

    /// Repository whose writes can be switched off.
    #[derive(Default)]
    struct FlakyRepository {
        inner: MemoryRepository,
        failing: AtomicBool,
    }

    impl ProgressRepository for FlakyRepository {
        fn load(&self, key: &ProgressKey) -> Result<Option<ProgressStats>, PersistError> {
            self.inner.load(key)
        }

        fn save(&self, key: &ProgressKey, stats: &ProgressStats) -> Result<(), PersistError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PersistError::Unavailable("quota exceeded".to_string()));
            }
            self.inner.save(key, stats)
        }
    }

    #[test]
    fn test_reviews_are_persisted() {
        let repository = Arc::new(MemoryRepository::new());
        let clock = Arc::new(FixedClock::new(start()));
        let mut store = ProgressStore::open(key(), repository.clone(), clock).unwrap();

        assert!(store.record_review("v1", true).is_persisted());

        let saved = repository.load(&key()).unwrap().unwrap();
        assert_eq!(saved, store.snapshot());
        assert_eq!(saved.total_reviews, 1);
    }

    #[test]
    fn test_reopen_restores_state() {
        let repository = Arc::new(MemoryRepository::new());
        let clock = Arc::new(FixedClock::new(start()));

        let mut store = ProgressStore::open(key(), repository.clone(), clock.clone()).unwrap();
        let _ = store.record_review("v1", true);
        let _ = store.record_review("v2", false);
        drop(store);

        let reopened = ProgressStore::open(key(), repository, clock).unwrap();
        assert_eq!(reopened.card_status("v1"), CardStatus::Learning);
        assert_eq!(reopened.hard_cards(&["v1", "v2"]), vec!["v2"]);
    }

    #[test]
    fn test_due_cards_follow_the_clock() {
        let clock = Arc::new(FixedClock::new(start()));
        let mut store =
            ProgressStore::open(key(), MemoryRepository::new(), clock.clone()).unwrap();

        let _ = store.record_review("v1", true); // next review tomorrow
        assert_eq!(store.due_cards(&["v1", "v2"]), vec!["v2"]);

        clock.advance_days(1);
        assert_eq!(store.due_cards(&["v1", "v2"]), vec!["v1", "v2"]);
    }

    #[test]
    fn test_streak_decays_lazily() {
        let repository = Arc::new(MemoryRepository::new());
        let clock = Arc::new(FixedClock::new(start()));
        let mut store = ProgressStore::open(key(), repository.clone(), clock.clone()).unwrap();

        let _ = store.record_review("v1", true);
        clock.advance_days(1);
        let _ = store.record_review("v1", true);
        assert_eq!(store.snapshot().streak, 2);

        clock.advance_days(2);
        // The stored record still carries the old streak until someone looks.
        assert_eq!(repository.load(&key()).unwrap().unwrap().streak, 2);
        assert_eq!(store.snapshot().streak, 0);
        assert_eq!(repository.load(&key()).unwrap().unwrap().streak, 0);

        let _ = store.record_review("v1", true);
        assert_eq!(store.snapshot().streak, 1);
    }

    #[test]
    fn test_open_decays_stale_streak() {
        let repository = Arc::new(MemoryRepository::new());
        let clock = Arc::new(FixedClock::new(start()));

        let mut store = ProgressStore::open(key(), repository.clone(), clock.clone()).unwrap();
        let _ = store.record_review("v1", true);
        drop(store);

        clock.advance_days(5);
        let _store = ProgressStore::open(key(), repository.clone(), clock).unwrap();
        assert_eq!(repository.load(&key()).unwrap().unwrap().streak, 0);
    }

    #[test]
    fn test_gap_without_read_restarts_streak() {
        let clock = Arc::new(FixedClock::new(start()));
        let mut store =
            ProgressStore::open(key(), MemoryRepository::new(), clock.clone()).unwrap();

        let _ = store.record_review("v1", true);
        clock.advance_days(1);
        let _ = store.record_review("v1", true);
        clock.advance_days(2);
        // No snapshot in between: the increment path alone restarts the streak.
        let _ = store.record_review("v1", true);
        assert_eq!(store.snapshot().streak, 1);
    }

    #[test]
    fn test_write_failure_keeps_update_in_memory() {
        let repository = Arc::new(FlakyRepository::default());
        let clock = Arc::new(FixedClock::new(start()));
        let mut store = ProgressStore::open(key(), repository.clone(), clock).unwrap();

        let _ = store.record_review("v1", true);
        repository.failing.store(true, Ordering::SeqCst);

        let durability = store.record_review("v1", true);
        assert!(!durability.is_persisted());
        assert!(matches!(
            durability.warning(),
            Some(PersistError::Unavailable(_))
        ));
        assert!(store.last_failure().unwrap().contains("quota exceeded"));

        // The session keeps working on the newer state.
        assert_eq!(store.card("v1").unwrap().correct_count, 2);
        assert_eq!(store.snapshot().total_reviews, 2);
        assert_eq!(repository.load(&key()).unwrap().unwrap().total_reviews, 1);

        repository.failing.store(false, Ordering::SeqCst);
        assert!(store.record_review("v2", false).is_persisted());
        assert!(store.last_failure().is_none());
        assert_eq!(repository.load(&key()).unwrap().unwrap().total_reviews, 3);
    }

    #[test]
    fn test_unreadable_record_is_not_overwritten() {
        let repository = Arc::new(MemoryRepository::new());
        repository.insert_raw(key(), "{broken").unwrap();
        let clock = Arc::new(FixedClock::new(start()));

        let result = ProgressStore::open(key(), repository.clone(), clock);
        assert!(matches!(result, Err(PersistError::Deserialize { .. })));
        assert_eq!(repository.raw(&key()).unwrap().as_deref(), Some("{broken"));
    }

    #[test]
    fn test_reset_progress() {
        let repository = Arc::new(MemoryRepository::new());
        let clock = Arc::new(FixedClock::new(start()));
        let mut store = ProgressStore::open(key(), repository.clone(), clock).unwrap();

        for _ in 0..3 {
            let _ = store.record_review("v1", true);
        }
        assert_eq!(store.snapshot().words_mastered, 1);

        assert!(store.reset_progress().is_persisted());
        assert_eq!(store.snapshot(), ProgressStats::default());
        assert_eq!(store.card_status("v1"), CardStatus::New);
        assert_eq!(
            repository.load(&key()).unwrap(),
            Some(ProgressStats::default())
        );
    }

    #[test]
    fn test_daily_plan_uses_today() {
        let clock = Arc::new(FixedClock::new(start()));
        let mut store =
            ProgressStore::open(key(), MemoryRepository::new(), clock.clone()).unwrap();
        let _ = store.record_review("a", false);

        assert_eq!(store.daily_plan(&["a", "b"], 10).due_count, 1);
        clock.advance_days(1);
        let plan = store.daily_plan(&["a", "b"], 1);
        assert_eq!(plan.due_count, 2);
        assert_eq!(plan.card_goal, 1);
        assert_eq!(plan.hard_count, 1);
    }
}
