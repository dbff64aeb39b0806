use crate::config::{Environment, LogLevel};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
};

type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// `RUST_LOG` takes precedence over `log_level` when it is set. Spans are
/// bridged to OpenTelemetry; without an installed tracer provider they go nowhere.
pub fn setup_logging(log_level: LogLevel, environment: Environment) {
    init_subscriber(tracing_opentelemetry::layer(), log_level, environment);
}

/// Install the global subscriber: env filter, then `otel_layer`, then the formatter.
pub(crate) fn init_subscriber<L>(otel_layer: L, log_level: LogLevel, environment: Environment)
where
    L: Layer<FilteredRegistry> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));

    let fmt_layer: Box<dyn Layer<Layered<L, FilteredRegistry>> + Send + Sync> = match environment
    {
        Environment::Production => tracing_subscriber::fmt::layer()
            .json()
            .with_level(true)
            .with_current_span(true)
            .boxed(),
        Environment::Development => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer)
        .with(fmt_layer)
        .init();
}
