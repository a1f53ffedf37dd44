// Process setup: logging and shared state

use crate::http::ApiState;
use olivefly_core::{LogFormat, ServiceConfig};
use olivefly_eye::{DetectionPipeline, DetectorConfig, ModelHandle};
use olivefly_notify::{Notifier, WhatsAppNotifier};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    // a second init (tests, embedding) is not an error worth failing on
    let result = match config.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

/// Build the shared request state. The model is not loaded here.
pub fn build_state(config: ServiceConfig) -> anyhow::Result<ApiState> {
    let detector_config = DetectorConfig::from_service(&config);
    detector_config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid detector configuration: {}", e))?;
    let models = Arc::new(ModelHandle::yolo(detector_config));

    let pipeline = Arc::new(DetectionPipeline::new(
        config.target_classes.clone(),
        config.model_name(),
    ));

    let notifier: Arc<dyn Notifier> = Arc::new(WhatsAppNotifier::from_service(&config)?);

    info!(
        "Model {:?}, target classes [{}], API key {}, WhatsApp {}",
        config.model_path,
        config.target_classes,
        if config.api_key_required() { "required" } else { "disabled" },
        if notifier.is_configured() { "configured" } else { "not configured" },
    );

    Ok(ApiState {
        config: Arc::new(config),
        models,
        pipeline,
        notifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_state_does_not_load_model() {
        let config = ServiceConfig {
            model_path: "/nonexistent/olivefly.onnx".into(),
            ..ServiceConfig::default()
        };
        let state = build_state(config).unwrap();
        assert!(!state.models.is_loaded());
        assert_eq!(state.pipeline.model_name(), "olivefly.onnx");
        assert!(!state.notifier.is_configured());
    }
}
