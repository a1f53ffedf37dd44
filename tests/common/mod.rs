// Shared fixtures for the HTTP tests
#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageOutputFormat, RgbImage};
use olivefly_core::{ClassNameTable, RawBox, RawValue, ServiceConfig, TargetClassFilter};
use olivefly_eye::{DetectionPipeline, Detector, DetectorOutput, ModelHandle, VisionError};
use olivefly_notify::{Notifier, NotifyError, WhatsAppConfig, WhatsAppNotifier};
use olivefly_server::ApiState;
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::Arc;

pub const API_KEY: &str = "trap-key-1";
pub const BOUNDARY: &str = "olivefly-test-boundary";

/// Always reports the same fly and leaf, whatever the image.
pub struct StubDetector;

impl Detector for StubDetector {
    fn detect(&self, _image: &RgbImage) -> Result<DetectorOutput, VisionError> {
        Ok(DetectorOutput {
            class_names: vec![(0, "fly"), (1, "leaf")]
                .into_iter()
                .collect::<ClassNameTable>(),
            boxes: vec![
                RawBox {
                    cls: RawValue::Scalar(0.0),
                    conf: RawValue::Scalar(0.9),
                    xyxy: vec![10.0, 10.0, 50.0, 50.0],
                },
                RawBox {
                    cls: RawValue::Scalar(1.0),
                    conf: RawValue::Scalar(0.1),
                    xyxy: vec![0.0, 0.0, 5.0, 5.0],
                },
            ],
        })
    }
}

/// Records every message instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, to: &str, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().push((to.to_string(), text.to_string()));
        Ok(())
    }
}

pub fn config() -> ServiceConfig {
    ServiceConfig {
        api_key: API_KEY.to_string(),
        ..ServiceConfig::default()
    }
}

pub fn state_with(
    config: ServiceConfig,
    models: ModelHandle,
    notifier: Arc<dyn Notifier>,
) -> ApiState {
    let pipeline = DetectionPipeline::new(config.target_classes.clone(), config.model_name());
    ApiState {
        config: Arc::new(config),
        models: Arc::new(models),
        pipeline: Arc::new(pipeline),
        notifier,
    }
}

/// State with the stub detector already loaded and a recording notifier.
pub fn stub_state(config: ServiceConfig) -> (ApiState, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let models = ModelHandle::preloaded(config.model_path.clone(), Arc::new(StubDetector));
    let state = state_with(config, models, notifier.clone());
    (state, notifier)
}

/// State whose model never loads.
pub fn broken_model_state(config: ServiceConfig) -> ApiState {
    let models = ModelHandle::new(config.model_path.clone(), |path| {
        Err(VisionError::ModelUnavailable(format!("{} is missing", path.display())))
    });
    state_with(config, models, Arc::new(RecordingNotifier::default()))
}

/// State with the real WhatsApp notifier and no credentials.
pub fn unconfigured_notifier_state(config: ServiceConfig) -> ApiState {
    let models = ModelHandle::preloaded(config.model_path.clone(), Arc::new(StubDetector));
    let notifier = WhatsAppNotifier::new(WhatsAppConfig::default()).unwrap();
    state_with(config, models, Arc::new(notifier))
}

pub fn with_targets(mut config: ServiceConfig, targets: &str) -> ServiceConfig {
    config.target_classes = TargetClassFilter::parse(targets);
    config
}

pub fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_pixel(64, 48, image::Rgb([90, 120, 40]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

/// A multipart/form-data body with a single file field.
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
