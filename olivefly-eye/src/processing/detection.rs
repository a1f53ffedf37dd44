//! Detection pipeline: detector output to client summary

use crate::detector::Detector;
use crate::error::VisionError;
use image::RgbImage;
use olivefly_core::{
    filter_and_aggregate, normalize_candidates_with, CandidatePolicy, DetectionSummary,
    MinConfidence, TargetClassFilter,
};
use std::time::Instant;
use tracing::debug;

/// Turns one decoded image into a [`DetectionSummary`].
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    target_classes: TargetClassFilter,
    model_name: String,
    policy: CandidatePolicy,
}

impl DetectionPipeline {
    /// Create a new detection pipeline
    pub fn new(target_classes: TargetClassFilter, model_name: impl Into<String>) -> Self {
        Self {
            target_classes,
            model_name: model_name.into(),
            policy: CandidatePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CandidatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Run the detector and filter its output.
    ///
    /// `inference_ms` covers the detector call only.
    pub fn run(
        &self,
        detector: &dyn Detector,
        image: &RgbImage,
        min_conf: MinConfidence,
    ) -> Result<DetectionSummary, VisionError> {
        debug!("Running detection on {}x{} image", image.width(), image.height());
        let started = Instant::now();
        let output = detector.detect(image)?;
        let inference_ms = started.elapsed().as_millis() as u64;

        let candidates = normalize_candidates_with(&output.boxes, self.policy)?;
        let filtered = filter_and_aggregate(
            &candidates,
            &output.class_names,
            min_conf,
            &self.target_classes,
        );
        debug!(
            "Kept {} of {} candidates at min_conf {}",
            filtered.count,
            candidates.len(),
            min_conf.value()
        );

        Ok(DetectionSummary::from_filtered(
            filtered,
            inference_ms,
            min_conf,
            self.model_name.clone(),
        ))
    }
}
