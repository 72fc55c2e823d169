use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// HTTP client internals used by the proxy; chatty below `warn`.
const QUIET_TARGETS: [&str; 3] = ["hyper_util=warn", "reqwest=warn", "h2=warn"];

/// Install a global tracing subscriber using the provided logging settings.
///
/// `RUST_LOG`, when set, replaces the configured level entirely.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(logging.level, rust_log.as_deref());

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

fn build_filter(level: LevelFilter, rust_log: Option<&str>) -> EnvFilter {
    let directives = match rust_log.map(str::trim).filter(|spec| !spec.is_empty()) {
        Some(spec) => spec.to_string(),
        None => format!("{level},{}", QUIET_TARGETS.join(",")),
    };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives)
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "shareabouts_cache_hit_total",
            Unit::Count,
            "Reads answered from the response cache, by family."
        );
        describe_counter!(
            "shareabouts_cache_miss_total",
            Unit::Count,
            "Reads that ran the resource computation, by family."
        );
        describe_counter!(
            "shareabouts_cache_store_failed_total",
            Unit::Count,
            "Computed responses that could not be stored."
        );
        describe_counter!(
            "shareabouts_cache_invalidate_total",
            Unit::Count,
            "Family invalidations, by family."
        );
        describe_counter!(
            "shareabouts_cache_invalidate_failed_total",
            Unit::Count,
            "Family invalidations that left keys behind, by family."
        );
        describe_counter!(
            "shareabouts_cache_evict_total",
            Unit::Count,
            "Responses evicted from the in-memory store due to capacity."
        );
        describe_gauge!(
            "shareabouts_cache_entries",
            Unit::Count,
            "Responses currently held by the in-memory store."
        );
    });
}
