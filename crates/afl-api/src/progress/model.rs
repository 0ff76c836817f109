use afl_progress::{CardProgress, CardStatus, ProgressStats};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Most card ids accepted in one query.
pub const MAX_CANDIDATES: usize = 5000;

/// Largest session a daily plan may be built for.
pub const MAX_SESSION_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub card_id: String,
    /// Whether the learner answered correctly
    pub correct: bool,
}

impl ReviewRequest {
    /// Reject an empty card id.
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_card_id(&self.card_id)
    }
}

/// Candidate cards for the due and hard queries.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardIdsRequest {
    pub card_ids: Vec<String>,
}

impl CardIdsRequest {
    /// Reject more than [`MAX_CANDIDATES`] ids.
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_candidates(&self.card_ids)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub card_ids: Vec<String>,
    /// Defaults to the standard session size when absent
    pub session_size: Option<usize>,
}

impl PlanRequest {
    /// Validate the request and return the session size to plan for.
    pub fn validate(&self) -> Result<usize, ApiError> {
        validate_candidates(&self.card_ids)?;
        let session_size = self.session_size.unwrap_or(afl_srs::DEFAULT_SESSION_SIZE);
        if !(1..=MAX_SESSION_SIZE).contains(&session_size) {
            return Err(ApiError::Validation(format!(
                "sessionSize must be between 1 and {MAX_SESSION_SIZE}"
            )));
        }
        Ok(session_size)
    }
}

/// Matching card ids, in the order they were asked for.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardIdsResponse {
    pub card_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStatusResponse {
    pub card_id: String,
    pub status: CardStatus,
}

/// Result of recording one review.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    /// The reviewed card after rescheduling
    pub card: CardProgress,
    pub stats: ProgressStats,
    /// `false` when the review is only held in server memory
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    /// `false` when the reset is only held in server memory
    pub persisted: bool,
}

pub fn validate_card_id(card_id: &str) -> Result<(), ApiError> {
    if card_id.is_empty() {
        return Err(ApiError::Validation("cardId must not be empty".to_string()));
    }
    Ok(())
}

fn validate_candidates(card_ids: &[String]) -> Result<(), ApiError> {
    if card_ids.len() > MAX_CANDIDATES {
        return Err(ApiError::Validation(format!(
            "at most {MAX_CANDIDATES} card ids per request"
        )));
    }
    Ok(())
}
