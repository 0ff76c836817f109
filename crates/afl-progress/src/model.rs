//! Progress records and the pure transitions applied to them.

use std::{collections::BTreeMap, fmt};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifies one progress record: a learner studying a language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressKey {
    pub learner_id: String,
    pub language_id: String,
}

impl ProgressKey {
    /// Ids are taken as given; routing and storage escape them as needed.
    pub fn new(learner_id: impl Into<String>, language_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            language_id: language_id.into(),
        }
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.learner_id, self.language_id)
    }
}

/// Review history of a single card. Exists once the card has been reviewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProgress {
    /// Key into the vocabulary catalog
    pub card_id: String,
    pub correct_count: u32,
    pub incorrect_count: u32,
    /// Day of the most recent review
    #[serde(with = "calendar_date")]
    pub last_reviewed: NaiveDate,
    /// Day the card becomes due again
    #[serde(with = "calendar_date")]
    pub next_review: NaiveDate,
    /// Days between `last_reviewed` and `next_review`
    pub interval: u32,
    /// Multiplier applied to `interval` after a correct answer
    pub ease_factor: f64,
}

impl CardProgress {
    /// State of a card that has not been reviewed yet.
    pub fn new(card_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            card_id: card_id.into(),
            correct_count: 0,
            incorrect_count: 0,
            last_reviewed: today,
            next_review: today,
            interval: 0,
            ease_factor: afl_srs::INITIAL_EASE,
        }
    }

    /// Due on `next_review` and every day after it.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        afl_srs::is_due(self.next_review, today)
    }

    /// Answered wrong more often than right.
    pub const fn is_hard(&self) -> bool {
        self.incorrect_count > self.correct_count
    }

    /// Answered correctly at least [`afl_srs::MASTERY_THRESHOLD`] times.
    pub const fn is_mastered(&self) -> bool {
        afl_srs::is_mastered(self.correct_count)
    }

    fn apply_review(&mut self, correct: bool, today: NaiveDate) {
        let schedule = afl_srs::compute_next_schedule(correct, self.interval, self.ease_factor);

        if correct {
            self.correct_count = self.correct_count.saturating_add(1);
        } else {
            self.incorrect_count = self.incorrect_count.saturating_add(1);
        }
        self.last_reviewed = today;
        self.next_review = afl_srs::next_review_date(today, schedule.interval);
        self.interval = schedule.interval;
        self.ease_factor = schedule.ease_factor;
    }
}

/// Learning stage of a card as shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Never reviewed
    New,
    Learning,
    Mastered,
}

impl CardStatus {
    /// Lowercase name, as serialized.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Mastered => "mastered",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a daily review session looks like for a set of candidate cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    /// Candidates that are new or due today
    pub due_count: usize,
    /// Candidates answered wrong more often than right
    pub hard_count: usize,
    /// Cards to review in this session
    pub card_goal: usize,
    /// Half a minute per card, rounded up
    pub estimated_minutes: usize,
}

/// Everything tracked for one learner in one language.
///
/// This is the unit of persistence: it is always loaded and saved whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressStats {
    /// Consecutive days with at least one review
    pub streak: u32,
    /// Day of the most recent review of any card
    #[serde(with = "calendar_date::option")]
    pub last_practice_date: Option<NaiveDate>,
    /// Cards with at least [`afl_srs::MASTERY_THRESHOLD`] correct answers
    pub words_mastered: u32,
    pub total_reviews: u64,
    /// Reviewed cards by id
    pub card_progress: BTreeMap<String, CardProgress>,
}

impl ProgressStats {
    /// Record one review outcome for `card_id` on `today`.
    ///
    /// Returns the card's updated progress.
    pub fn record_review(&mut self, card_id: &str, correct: bool, today: NaiveDate) -> &CardProgress {
        self.streak = afl_srs::next_streak(self.streak, self.last_practice_date, today);
        self.total_reviews = self.total_reviews.saturating_add(1);
        self.last_practice_date = Some(today);

        self.card_progress
            .entry(card_id.to_string())
            .or_insert_with(|| CardProgress::new(card_id, today))
            .apply_review(correct, today);

        self.words_mastered = self.count_mastered();

        &self.card_progress[card_id]
    }

    /// Zero the streak if the learner skipped a day since the last practice.
    ///
    /// Returns `true` when the stats changed.
    pub fn decay_streak(&mut self, today: NaiveDate) -> bool {
        let streak = afl_srs::effective_streak(self.streak, self.last_practice_date, today);
        if streak == self.streak {
            return false;
        }
        self.streak = streak;
        true
    }

    /// Number of cards at or above the mastery threshold, counted from scratch.
    pub fn count_mastered(&self) -> u32 {
        let mastered = self.card_progress.values().filter(|c| c.is_mastered()).count();
        u32::try_from(mastered).unwrap_or(u32::MAX)
    }

    /// Progress of `card_id`, or `None` if it was never reviewed.
    pub fn card(&self, card_id: &str) -> Option<&CardProgress> {
        self.card_progress.get(card_id)
    }

    /// Candidates that are new or scheduled for `today` or earlier, in input order.
    pub fn due_cards<S: AsRef<str>>(&self, candidates: &[S], today: NaiveDate) -> Vec<String> {
        candidates
            .iter()
            .map(S::as_ref)
            .filter(|id| self.card(id).is_none_or(|c| c.is_due(today)))
            .map(str::to_string)
            .collect()
    }

    /// Candidates answered wrong more often than right, in input order.
    pub fn hard_cards<S: AsRef<str>>(&self, candidates: &[S]) -> Vec<String> {
        candidates
            .iter()
            .map(S::as_ref)
            .filter(|id| self.card(id).is_some_and(CardProgress::is_hard))
            .map(str::to_string)
            .collect()
    }

    /// New until first reviewed, mastered once at the threshold, learning in between.
    pub fn card_status(&self, card_id: &str) -> CardStatus {
        match self.card(card_id) {
            None => CardStatus::New,
            Some(card) if card.is_mastered() => CardStatus::Mastered,
            Some(_) => CardStatus::Learning,
        }
    }

    /// Size a session over `candidates`: all due cards, capped at `session_size`.
    ///
    /// A zero `session_size` yields a zero goal.
    ///
    /// ```
    /// use afl_progress::ProgressStats;
    /// use chrono::NaiveDate;
    ///
    /// let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    /// let mut stats = ProgressStats::default();
    /// stats.record_review("v1", false, today);
    ///
    /// // "v1" is due tomorrow; "v2" and "v3" are new.
    /// let plan = stats.daily_plan(&["v1", "v2", "v3"], 10, today);
    /// assert_eq!(plan.due_count, 2);
    /// assert_eq!(plan.hard_count, 1);
    /// assert_eq!(plan.card_goal, 2);
    /// assert_eq!(plan.estimated_minutes, 1);
    /// ```
    pub fn daily_plan<S: AsRef<str>>(
        &self,
        candidates: &[S],
        session_size: usize,
        today: NaiveDate,
    ) -> DailyPlan {
        let due_count = self.due_cards(candidates, today).len();
        let card_goal = afl_srs::session_card_goal(due_count, session_size);

        DailyPlan {
            due_count,
            hard_count: self.hard_cards(candidates).len(),
            card_goal,
            estimated_minutes: afl_srs::estimated_minutes(card_goal),
        }
    }
}

/// Calendar dates as ISO `YYYY-MM-DD`.
///
/// Reading also accepts the `Mon Oct 19 2026` form written by the browser
/// client's `Date.toDateString()`.
mod calendar_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const LEGACY_FORMAT: &str = "%a %b %d %Y";

    pub(super) fn parse(value: &str) -> Option<NaiveDate> {
        value
            .parse::<NaiveDate>()
            .or_else(|_| NaiveDate::parse_from_str(value, LEGACY_FORMAT))
            .ok()
    }

    pub(super) fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(date)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid calendar date: {raw}")))
    }

    pub(super) mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub(in super::super) fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => serializer.collect_str(date),
                None => serializer.serialize_none(),
            }
        }

        pub(in super::super) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    super::parse(&raw)
                        .ok_or_else(|| D::Error::custom(format!("invalid calendar date: {raw}")))
                })
                .transpose()
        }
    }
}
