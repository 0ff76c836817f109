//! Log output for the server.
//!
//! Development gets pretty lines with source locations; production gets
//! flattened JSON carrying the request span. `RUST_LOG` overrides the default
//! filter in both.

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::Environment;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber for `env`.
pub fn init_tracing(env: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(env)));

    tracing_subscriber::registry()
        .with(output_layer(env).with_filter(filter))
        .init();

    tracing::info!(environment = ?env, "tracing initialized");
}

fn default_filter(env: &Environment) -> &'static str {
    if env.is_development() {
        "debug,tower_http=debug,sqlx=warn"
    } else {
        "info,tower_http=info,sqlx=warn"
    }
}

fn output_layer(env: &Environment) -> BoxedLayer {
    let layer = fmt::layer().with_target(true);
    if env.is_development() {
        layer.with_file(true).with_line_number(true).pretty().boxed()
    } else {
        layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .flatten_event(true)
            .boxed()
    }
}
