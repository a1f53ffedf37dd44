// Service configuration, resolved once at process start

use crate::error::{Error, Result};
use crate::types::TargetClassFilter;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Everything the service reads from its environment.
///
/// Keys match the environment variable names in lowercase, so `MODEL_PATH`
/// sets `model_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    #[serde(deserialize_with = "deserialize_target_classes")]
    pub target_classes: TargetClassFilter,
    /// Empty disables the API key check
    pub api_key: String,
    pub whatsapp_token: String,
    pub whatsapp_phone_number_id: String,
    pub whatsapp_api_version: String,
    pub whatsapp_base_url: String,
    pub notify_timeout_secs: u64,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub max_upload_bytes: usize,
    pub detector_score_floor: f32,
    pub detector_iou: f32,
    pub detector_input_size: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("weights/olivefly.onnx"),
            target_classes: TargetClassFilter::default(),
            api_key: String::new(),
            whatsapp_token: String::new(),
            whatsapp_phone_number_id: String::new(),
            whatsapp_api_version: "v17.0".to_string(),
            whatsapp_base_url: "https://graph.facebook.com".to_string(),
            notify_timeout_secs: 15,
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            max_upload_bytes: 20 * 1024 * 1024,
            detector_score_floor: 0.25,
            detector_iou: 0.7,
            detector_input_size: 640,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelList {
    Joined(String),
    Items(Vec<String>),
}

fn deserialize_target_classes<'de, D>(deserializer: D) -> std::result::Result<TargetClassFilter, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LabelList::deserialize(deserializer)? {
        LabelList::Joined(list) => TargetClassFilter::parse(&list),
        LabelList::Items(items) => TargetClassFilter::new(items),
    })
}

impl ServiceConfig {
    /// Defaults, then an optional TOML file, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_from(file, None)
    }

    /// Same as [`ServiceConfig::load`] with an explicit environment map
    /// standing in for the process environment when given.
    pub fn load_from(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ServiceConfig::default())?);

        if let Some(path) = file {
            if !path.exists() {
                return Err(Error::Configuration(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(config::Environment::default().source(env));

        let config: ServiceConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Configuration("port cannot be 0".to_string()));
        }

        if self.max_upload_bytes == 0 {
            return Err(Error::Configuration("max_upload_bytes must be > 0".to_string()));
        }

        if self.notify_timeout_secs == 0 {
            return Err(Error::Configuration("notify_timeout_secs must be > 0".to_string()));
        }

        if !(0.0..=1.0).contains(&self.detector_score_floor) {
            return Err(Error::Configuration(
                "detector_score_floor must be within [0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.detector_iou) {
            return Err(Error::Configuration("detector_iou must be within [0, 1]".to_string()));
        }

        // YOLO strides go up to 32
        if self.detector_input_size == 0 || self.detector_input_size % 32 != 0 {
            return Err(Error::Configuration(
                "detector_input_size must be a positive multiple of 32".to_string(),
            ));
        }

        Ok(())
    }

    /// File name of the model, reported back to clients.
    pub fn model_name(&self) -> String {
        self.model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.model_path.to_string_lossy().into_owned())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn api_key_required(&self) -> bool {
        !self.api_key.is_empty()
    }
}
