use gateway::{
    config::get_configuration, handler::DetectionHandler, logging::setup_logging,
    server::run_server, state::AppState,
};
use inference::{InferenceEngine, ModelManager};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;
    let _telemetry = setup_logging(&config)?;

    tracing::info!(
        environment = config.environment.as_str(),
        model_path = %config.model_path,
        "Starting detection gateway"
    );

    let detector_config = config.detector_config();
    let manager = Arc::new(ModelManager::new());
    {
        let manager = Arc::clone(&manager);
        // Absorbs load failures; the service still starts and reports Not Loaded
        tokio::task::spawn_blocking(move || manager.initialize(&detector_config)).await?;
    }
    if let Some(reason) = manager.failure() {
        tracing::warn!(reason, "Serving without a model");
    }

    let handler = DetectionHandler::new(manager);
    let state = AppState::new(handler, config.request_timeout(), config.max_body_bytes);

    run_server(&config, state).await
}
