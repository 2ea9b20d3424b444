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
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "collate_file_set_hit_total",
            Unit::Count,
            "Total number of path sets answered from the file-set cache."
        );
        describe_counter!(
            "collate_file_set_miss_total",
            Unit::Count,
            "Total number of path sets that had to be aggregated."
        );
        describe_counter!(
            "collate_file_set_evict_total",
            Unit::Count,
            "Total number of file-set cache evictions due to capacity."
        );
        describe_counter!(
            "collate_resource_missing_total",
            Unit::Count,
            "Total number of dependencies that could not be found."
        );
        describe_counter!(
            "collate_compress_fallback_total",
            Unit::Count,
            "Total number of compressor failures answered with raw source."
        );
        describe_histogram!(
            "collate_aggregate_build_ms",
            Unit::Milliseconds,
            "Aggregate build latency in milliseconds."
        );
    });
}
