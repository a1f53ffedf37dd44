//! olivefly-eye: image decoding and object detection
//!
//! Wraps a YOLO ONNX export behind the [`Detector`] trait and turns its raw
//! output into a filtered [`olivefly_core::DetectionSummary`].

pub mod config;
pub mod decode;
pub mod detector;
pub mod error;
pub mod models;
pub mod processing;
mod utils;

pub use config::DetectorConfig;
pub use decode::decode_image;
pub use detector::{Detector, DetectorOutput};
pub use error::VisionError;
pub use models::{ModelHandle, YoloDetector};
pub use processing::DetectionPipeline;
