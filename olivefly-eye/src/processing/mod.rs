//! Detection processing pipelines

pub mod detection;

pub use detection::DetectionPipeline;
