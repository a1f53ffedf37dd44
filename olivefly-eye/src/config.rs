//! Configuration for the detector backend

use olivefly_core::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// YOLO detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Path to the ONNX model
    pub model_path: PathBuf,
    /// Square model input side in pixels
    pub input_size: u32,
    /// Scores below this never leave the detector
    pub score_floor: f32,
    /// IoU above which a same-class box is suppressed
    pub iou_threshold: f32,
    /// Upper bound on boxes returned per image
    pub max_detections: usize,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("weights/olivefly.onnx"),
            input_size: 640,
            score_floor: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            intra_threads: 4,
        }
    }
}

impl DetectorConfig {
    pub fn from_service(config: &ServiceConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            input_size: config.detector_input_size,
            score_floor: config.detector_score_floor,
            iou_threshold: config.detector_iou,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.input_size == 0 || self.input_size % 32 != 0 {
            return Err("Input size must be a positive multiple of 32".to_string());
        }

        if self.input_size > 4096 {
            return Err("Input size too large (max 4096)".to_string());
        }

        if !self.score_floor.is_finite() || !(0.0..=1.0).contains(&self.score_floor) {
            return Err("Score floor must be within [0, 1]".to_string());
        }

        if !self.iou_threshold.is_finite() || !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err("IoU threshold must be within [0, 1]".to_string());
        }

        if self.max_detections == 0 {
            return Err("Max detections must be > 0".to_string());
        }

        if self.intra_threads == 0 {
            return Err("Intra threads must be > 0".to_string());
        }

        Ok(())
    }
}
