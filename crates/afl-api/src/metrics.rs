//! Prometheus metrics for request traffic and progress writes.

use std::{sync::LazyLock, time::Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

static PROGRESS_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/progress/[^/]+/[^/]+(?:/(reviews|due|hard|plan)|/(cards)/[^/]+)?$")
        .expect("valid progress route pattern")
});

/// Label for requests that match no route.
const UNKNOWN_PATH: &str = "/unknown";

/// Install the Prometheus recorder and return the handle used to render it.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Middleware recording request count, latency and in-flight requests.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let in_flight = gauge!("http_requests_in_flight", "method" => method.clone(), "path" => path.clone());
    in_flight.increment(1.0);
    let response = next.run(req).await;
    in_flight.decrement(1.0);

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(duration);

    response
}

/// Map a request path to its route template so each route is one label value.
///
/// Paths outside the route table share a single label.
fn normalize_path(path: &str) -> String {
    if matches!(path, "/health" | "/metrics") {
        return path.to_string();
    }

    let Some(captures) = PROGRESS_ROUTE.captures(path) else {
        return UNKNOWN_PATH.to_string();
    };
    match (captures.get(1), captures.get(2)) {
        (Some(action), _) => format!("/progress/:learner/:language/{}", action.as_str()),
        (None, Some(_)) => "/progress/:learner/:language/cards/:card".to_string(),
        (None, None) => "/progress/:learner/:language".to_string(),
    }
}

pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}

pub fn record_review_event(correct: bool) {
    let outcome = if correct { "correct" } else { "incorrect" };
    counter!("reviews_recorded_total", "outcome" => outcome).increment(1);
}

/// Count a progress write that did not reach storage.
pub fn record_persist_failure(backend: &'static str) {
    counter!("persist_failures_total", "backend" => backend).increment(1);
}
