use inference::{DetectorConfig, ExecutionProvider, config::DEFAULT_MODEL_PATH};
use serde::Deserialize;
use std::time::Duration;

pub use common::{Environment, LogLevel};

pub const SERVICE_NAME: &str = "gateway";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub model_path: String,
    pub labels_path: Option<String>,
    pub bind_addr: String,
    pub log_level: LogLevel,
    pub environment: Environment,
    pub execution_provider: ExecutionProvider,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub max_body_bytes: usize,
    pub request_timeout_secs: u64,
    pub otel_endpoint: Option<String>,
}

impl Config {
    /// Detector settings derived from the service configuration.
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            labels_path: self.labels_path.clone().filter(|p| !p.is_empty()),
            execution_provider: self.execution_provider,
            input_size: (self.input_width, self.input_height),
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
            ..DetectorConfig::new(self.model_path.clone())
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(self) -> Result<Self, config::ConfigError> {
        let fail = |msg: String| Err(config::ConfigError::Message(msg));

        if self.model_path.is_empty() {
            return fail("model_path must not be empty".to_string());
        }
        if self.input_width == 0 || self.input_height == 0 {
            return fail(format!(
                "input size must be non-zero, got {}x{}",
                self.input_width, self.input_height
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return fail(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return fail(format!(
                "iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            ));
        }
        if self.request_timeout_secs == 0 {
            return fail("request_timeout_secs must be at least 1".to_string());
        }
        if self.max_body_bytes == 0 {
            return fail("max_body_bytes must be at least 1".to_string());
        }
        if self.max_detections == 0 {
            return fail("max_detections must be at least 1".to_string());
        }

        Ok(self)
    }
}

/// Read configuration from the process environment.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    load(config::Environment::default())
}

fn load(source: config::Environment) -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("model_path", DEFAULT_MODEL_PATH)?
        .set_default("bind_addr", "0.0.0.0:8000")?
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("execution_provider", "cpu")?
        .set_default("input_width", 640)?
        .set_default("input_height", 640)?
        .set_default("confidence_threshold", 0.25)?
        .set_default("iou_threshold", 0.7)?
        .set_default("max_detections", 300)?
        .set_default("max_body_bytes", 50 * 1024 * 1024)?
        .set_default("request_timeout_secs", 60)?
        .add_source(source.try_parsing(true))
        .build()?;

    config.try_deserialize::<Config>()?.validate()
}
