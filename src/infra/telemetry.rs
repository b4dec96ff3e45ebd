use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
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
///
/// `RUST_LOG` directives take precedence over the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    // Logs go to stderr; stdout carries command output.
    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "catalog_cache_hit_total",
            Unit::Count,
            "Reads answered from the query cache, including cached failures."
        );
        describe_counter!(
            "catalog_cache_miss_total",
            Unit::Count,
            "Reads that started a request to the catalog service."
        );
        describe_counter!(
            "catalog_cache_invalidated_total",
            Unit::Count,
            "Cached queries marked stale by an invalidation."
        );
        describe_counter!(
            "catalog_fetch_error_total",
            Unit::Count,
            "Requests to the catalog service that failed."
        );
        describe_histogram!(
            "catalog_fetch_ms",
            Unit::Milliseconds,
            "Catalog service read latency in milliseconds."
        );
        describe_histogram!(
            "catalog_cache_consume_ms",
            Unit::Milliseconds,
            "Invalidation dispatch latency in milliseconds."
        );
        describe_gauge!(
            "catalog_cache_entries",
            Unit::Count,
            "Current number of cached query entries."
        );
    });
}
