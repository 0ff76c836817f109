//! Postgres backend tests. Each test returns early when `TEST_DATABASE_URL` is unset.

use std::sync::Arc;

use afl_db::repositories::progress;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tokio::task::JoinSet;

use crate::common::{fixed_clock, fresh_key, postgres_app};

#[tokio::test]
async fn test_review_is_stored_in_postgres() {
    let clock = fixed_clock();
    let Some((app, pool)) = postgres_app(clock.clone()).await else {
        return;
    };
    let (key, base) = fresh_key("yoruba");

    let body = app.review(&base, "v1", true).await;
    assert_eq!(body["persisted"], json!(true));
    assert_eq!(body["card"]["interval"], json!(1));
    assert_eq!(body["card"]["easeFactor"].as_f64(), Some(2.1));
    assert_eq!(body["card"]["nextReview"], json!("2026-10-20"));
    assert_eq!(body["stats"]["streak"], json!(1));

    clock.advance_days(1);
    let body = app.review(&base, "v1", true).await;
    assert_eq!(body["card"]["interval"], json!(3));
    assert_eq!(body["stats"]["streak"], json!(2));

    let stored = progress::find_stats(&pool, &key)
        .await
        .unwrap()
        .expect("row written");
    assert_eq!(stored.total_reviews, 2);
    assert_eq!(stored.streak, 2);
    assert_eq!(stored.card("v1").map(|card| card.interval), Some(3));
}

#[tokio::test]
async fn test_unknown_key_reads_empty_without_a_row() {
    let Some((app, pool)) = postgres_app(fixed_clock()).await else {
        return;
    };
    let (key, base) = fresh_key("igbo");

    let response = app.get(&base).await;
    response.assert_status(StatusCode::OK);
    let stats: Value = response.json();
    assert_eq!(stats["totalReviews"], json!(0));
    assert_eq!(stats["cardProgress"], json!({}));

    assert!(progress::find_stats(&pool, &key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_read_persists_decayed_streak() {
    let clock = fixed_clock();
    let Some((app, pool)) = postgres_app(clock.clone()).await else {
        return;
    };
    let (key, base) = fresh_key("yoruba");

    app.review(&base, "v1", true).await;
    clock.advance_days(1);
    app.review(&base, "v1", true).await;

    clock.advance_days(2);
    let stats: Value = app.get(&base).await.json();
    assert_eq!(stats["streak"], json!(0));
    assert_eq!(stats["totalReviews"], json!(2));

    let stored = progress::find_stats(&pool, &key)
        .await
        .unwrap()
        .expect("row written");
    assert_eq!(stored.streak, 0);
    assert_eq!(stored.total_reviews, 2);
}

#[tokio::test]
async fn test_reset_clears_postgres_row() {
    let Some((app, pool)) = postgres_app(fixed_clock()).await else {
        return;
    };
    let (key, base) = fresh_key("hausa");
    app.review(&base, "v1", true).await;
    app.review(&base, "v2", false).await;

    let response = app.delete(&base).await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "persisted": true }));

    let stored = progress::find_stats(&pool, &key)
        .await
        .unwrap()
        .expect("row kept");
    assert_eq!(stored.total_reviews, 0);
    assert!(stored.card_progress.is_empty());
    assert_eq!(stored.last_practice_date, None);
}

#[tokio::test]
async fn test_concurrent_reviews_on_one_key_are_all_counted() {
    let Some((app, pool)) = postgres_app(fixed_clock()).await else {
        return;
    };
    let app = Arc::new(app);
    let (key, base) = fresh_key("yoruba");

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let app = Arc::clone(&app);
        let base = base.clone();
        tasks.spawn(async move {
            let card_id = format!("v{}", i % 4);
            app.review(&base, &card_id, i % 3 != 0).await;
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    let stored = progress::find_stats(&pool, &key)
        .await
        .unwrap()
        .expect("row written");
    assert_eq!(stored.total_reviews, 20);
    assert_eq!(stored.card_progress.len(), 4);
    let per_card: u32 = stored
        .card_progress
        .values()
        .map(|card| card.correct_count + card.incorrect_count)
        .sum();
    assert_eq!(per_card, 20);
    assert_eq!(stored.streak, 1);
}
