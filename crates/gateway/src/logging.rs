use crate::config::{Config, SERVICE_NAME};
use common::TelemetryGuard;

/// Install the tracing subscriber, exporting over OTLP when an endpoint is configured.
///
/// The returned guard must be kept alive for the life of the process.
pub fn setup_logging(config: &Config) -> anyhow::Result<Option<TelemetryGuard>> {
    match config.otel_endpoint.as_deref().filter(|e| !e.is_empty()) {
        Some(endpoint) => {
            let guard =
                TelemetryGuard::init(SERVICE_NAME, endpoint, config.log_level, config.environment)?;
            tracing::info!(endpoint, "OpenTelemetry export enabled");
            Ok(Some(guard))
        }
        None => {
            common::setup_logging(config.log_level, config.environment);
            Ok(None)
        }
    }
}
