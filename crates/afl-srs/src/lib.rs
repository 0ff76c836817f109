//! SRS (Spaced Repetition System) policy for Afrolinguistic practice.
//!
//! This crate holds the pure scheduling rules behind the practice progress
//! tracker: how a review outcome moves a card's interval and ease factor, how
//! calendar days feed the practice streak, and how a daily review session is
//! sized. Nothing here reads the wall clock; callers pass "today" in.

use chrono::{Days, NaiveDate};

/// Correct answers needed before a card counts as mastered.
pub const MASTERY_THRESHOLD: u32 = 3;

/// Upper bound of a review interval, in days.
pub const MAX_INTERVAL_DAYS: u32 = 30;

/// Ease factor of a card that has never been reviewed.
pub const INITIAL_EASE: f64 = 2.0;

/// Lowest ease factor a card can reach.
pub const MIN_EASE: f64 = 1.3;

/// Highest ease factor a card can reach.
pub const MAX_EASE: f64 = 2.5;

/// Number of cards offered by a daily review when the learner picks nothing else.
pub const DEFAULT_SESSION_SIZE: usize = 10;

/// Time budget per card used to estimate session length.
pub const SECONDS_PER_CARD: usize = 30;

/// Ease gained by a correct answer.
pub const EASE_GAIN: f64 = 0.1;

/// Ease lost by an incorrect answer.
pub const EASE_PENALTY: f64 = 0.2;

// Binary drift below this is not a real difference (5 * 2.2 is 11.000000000000002).
const DRIFT: f64 = 1e-9;
const DRIFT_SCALE: f64 = 1e9;

/// Interval and ease factor a card carries after a review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    /// Days until the card is due again.
    pub interval: u32,
    /// Multiplier applied to the interval on the next correct answer.
    pub ease_factor: f64,
}

/// Compute the schedule that follows a review.
///
/// # Arguments
///
/// * `correct` - Whether the learner recalled the card
/// * `interval` - The card's interval before this review (`0` for a new card)
/// * `ease_factor` - The card's ease factor before this review
///
/// # Returns
///
/// The new [`Schedule`]
///
/// # Algorithm
///
/// * Correct, first review: interval 1
/// * Correct, later review: `ceil(interval * ease_factor)`, capped at 30 days
/// * Correct: ease grows by 0.1, capped at 2.5
/// * Incorrect: interval resets to 1, ease drops by 0.2, floored at 1.3
pub fn compute_next_schedule(correct: bool, interval: u32, ease_factor: f64) -> Schedule {
    let ease = if ease_factor.is_finite() {
        ease_factor
    } else {
        INITIAL_EASE
    };

    if correct {
        let grown = if interval == 0 {
            1.0
        } else {
            (f64::from(interval) * ease - DRIFT).ceil()
        };

        Schedule {
            interval: grown.clamp(1.0, f64::from(MAX_INTERVAL_DAYS)) as u32,
            ease_factor: settle((ease + EASE_GAIN).clamp(MIN_EASE, MAX_EASE)),
        }
    } else {
        Schedule {
            interval: 1,
            ease_factor: settle((ease - EASE_PENALTY).clamp(MIN_EASE, MAX_EASE)),
        }
    }
}

/// Round away binary drift so repeated steps land on the same values as decimal arithmetic.
fn settle(ease: f64) -> f64 {
    (ease * DRIFT_SCALE).round() / DRIFT_SCALE
}

/// Whether a card with `correct_count` correct answers is mastered.
pub const fn is_mastered(correct_count: u32) -> bool {
    correct_count >= MASTERY_THRESHOLD
}

/// The calendar day `interval` days after `today`.
pub fn next_review_date(today: NaiveDate, interval: u32) -> NaiveDate {
    today
        .checked_add_days(Days::new(u64::from(interval)))
        .unwrap_or(NaiveDate::MAX)
}

/// The calendar day before `today`.
pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(today)
}

/// Whether a card scheduled for `next_review` is due on `today`.
pub fn is_due(next_review: NaiveDate, today: NaiveDate) -> bool {
    next_review <= today
}

/// Streak after a review recorded on `today`.
///
/// # Arguments
///
/// * `streak` - Streak before the review
/// * `last_practice` - Day of the previous review, if any
/// * `today` - Day of this review
///
/// # Returns
///
/// * Same day as the last practice: unchanged
/// * Never practiced, or practiced yesterday: `streak + 1`
/// * Any other gap: 1
pub fn next_streak(streak: u32, last_practice: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_practice {
        Some(last) if last == today => streak,
        Some(last) if last != yesterday(today) => 1,
        _ => streak.saturating_add(1),
    }
}

/// Streak as it should read on `today`, before any review is recorded.
///
/// A streak survives while the last practice was today or yesterday and
/// reads as 0 after a longer gap.
pub fn effective_streak(streak: u32, last_practice: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_practice {
        Some(last) if last != today && last != yesterday(today) => 0,
        _ => streak,
    }
}

/// Number of cards a session should present given `due` cards and a session size.
pub fn session_card_goal(due: usize, session_size: usize) -> usize {
    due.min(session_size)
}

/// Estimated session length in whole minutes for `cards` cards.
pub const fn estimated_minutes(cards: usize) -> usize {
    (cards * SECONDS_PER_CARD).div_ceil(60)
}
