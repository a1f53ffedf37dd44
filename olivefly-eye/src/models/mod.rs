//! Detector backends and model lifecycle

pub mod manager;
pub mod yolo;

pub use manager::ModelHandle;
pub use yolo::{YoloDetector, COCO_CLASSES};
