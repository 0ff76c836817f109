use afl_progress::{DailyPlan, ProgressKey, ProgressStats};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    ApiState,
    error::ApiError,
    progress::model::{
        CardIdsRequest, CardIdsResponse, CardStatusResponse, PlanRequest, ResetResponse,
        ReviewRequest, ReviewResponse, validate_card_id,
    },
};

/// Create the progress routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route(
            "/progress/{learner_id}/{language_id}",
            get(get_progress).delete(reset_progress),
        )
        .route(
            "/progress/{learner_id}/{language_id}/reviews",
            post(record_review),
        )
        .route("/progress/{learner_id}/{language_id}/due", post(due_cards))
        .route("/progress/{learner_id}/{language_id}/hard", post(hard_cards))
        .route("/progress/{learner_id}/{language_id}/plan", post(daily_plan))
        .route(
            "/progress/{learner_id}/{language_id}/cards/{card_id}",
            get(card_status),
        )
}

fn progress_key(learner_id: String, language_id: String) -> ProgressKey {
    ProgressKey::new(learner_id, language_id)
}

async fn get_progress(
    State(state): State<ApiState>,
    Path((learner_id, language_id)): Path<(String, String)>,
) -> Result<Json<ProgressStats>, ApiError> {
    let stats = state
        .backend
        .snapshot(progress_key(learner_id, language_id))
        .await?;
    Ok(Json(stats))
}

async fn reset_progress(
    State(state): State<ApiState>,
    Path((learner_id, language_id)): Path<(String, String)>,
) -> Result<Json<ResetResponse>, ApiError> {
    let durability = state
        .backend
        .reset(progress_key(learner_id, language_id))
        .await?;
    Ok(Json(ResetResponse {
        persisted: durability.is_persisted(),
    }))
}

async fn record_review(
    State(state): State<ApiState>,
    Path((learner_id, language_id)): Path<(String, String)>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    payload.validate()?;

    let outcome = state
        .backend
        .record_review(
            progress_key(learner_id, language_id),
            payload.card_id,
            payload.correct,
        )
        .await?;

    Ok(Json(ReviewResponse {
        persisted: outcome.durability.is_persisted(),
        card: outcome.card,
        stats: outcome.stats,
    }))
}

async fn due_cards(
    State(state): State<ApiState>,
    Path((learner_id, language_id)): Path<(String, String)>,
    Json(payload): Json<CardIdsRequest>,
) -> Result<Json<CardIdsResponse>, ApiError> {
    payload.validate()?;

    let card_ids = state
        .backend
        .due_cards(progress_key(learner_id, language_id), payload.card_ids)
        .await?;
    Ok(Json(CardIdsResponse { card_ids }))
}

async fn hard_cards(
    State(state): State<ApiState>,
    Path((learner_id, language_id)): Path<(String, String)>,
    Json(payload): Json<CardIdsRequest>,
) -> Result<Json<CardIdsResponse>, ApiError> {
    payload.validate()?;

    let card_ids = state
        .backend
        .hard_cards(progress_key(learner_id, language_id), payload.card_ids)
        .await?;
    Ok(Json(CardIdsResponse { card_ids }))
}

async fn daily_plan(
    State(state): State<ApiState>,
    Path((learner_id, language_id)): Path<(String, String)>,
    Json(payload): Json<PlanRequest>,
) -> Result<Json<DailyPlan>, ApiError> {
    let session_size = payload.validate()?;

    let plan = state
        .backend
        .daily_plan(
            progress_key(learner_id, language_id),
            payload.card_ids,
            session_size,
        )
        .await?;
    Ok(Json(plan))
}

async fn card_status(
    State(state): State<ApiState>,
    Path((learner_id, language_id, card_id)): Path<(String, String, String)>,
) -> Result<Json<CardStatusResponse>, ApiError> {
    validate_card_id(&card_id)?;

    let status = state
        .backend
        .card_status(progress_key(learner_id, language_id), card_id.clone())
        .await?;
    Ok(Json(CardStatusResponse { card_id, status }))
}
