use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "comanda_cache_menu_hit_total",
            Unit::Count,
            "Total number of menu list cache hits."
        );
        describe_counter!(
            "comanda_cache_menu_miss_total",
            Unit::Count,
            "Total number of menu list cache misses."
        );
        describe_counter!(
            "comanda_cache_dish_hit_total",
            Unit::Count,
            "Total number of dish-by-id cache hits."
        );
        describe_counter!(
            "comanda_cache_dish_miss_total",
            Unit::Count,
            "Total number of dish-by-id cache misses."
        );
        describe_counter!(
            "comanda_cache_category_hit_total",
            Unit::Count,
            "Total number of category list cache hits."
        );
        describe_counter!(
            "comanda_cache_category_miss_total",
            Unit::Count,
            "Total number of category list cache misses."
        );
        describe_histogram!(
            "comanda_cache_consume_ms",
            Unit::Milliseconds,
            "Cache consumption latency in milliseconds."
        );
        describe_histogram!(
            "comanda_cache_warm_ms",
            Unit::Milliseconds,
            "Cache warm phase latency in milliseconds."
        );
    });
}
