//! Detector interface consumed by the detection pipeline

use crate::error::VisionError;
use image::RgbImage;
use olivefly_core::{ClassNameTable, RawBox};

/// Everything a detector hands back for one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorOutput {
    pub class_names: ClassNameTable,
    /// Raw boxes in detector order, coordinates in source image pixels
    pub boxes: Vec<RawBox>,
}

/// An opaque scorer. Any backend, or a stub, can sit behind it.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<DetectorOutput, VisionError>;
}
