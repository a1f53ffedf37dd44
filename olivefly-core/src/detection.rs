//! Detection result pipeline: confidence gating, label resolution,
//! allow-list filtering, rounding and aggregate statistics.
//!
//! Everything in here is pure. The same inputs always give the same output
//! and no input is mutated.

use crate::candidate::RawCandidate;
use crate::types::{ClassNameTable, MinConfidence, TargetClassFilter};
use serde::{Deserialize, Serialize};

const CONF_DECIMALS: i32 = 4;
const BOX_DECIMALS: i32 = 2;

/// Round to `decimals` places. Exact ties go to the even neighbour.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Client-facing detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub conf: f64,
    #[serde(rename = "box")]
    pub bbox: [f64; 4],
}

impl Detection {
    fn from_candidate(candidate: &RawCandidate, label: String) -> Self {
        Self {
            label,
            conf: round_to(candidate.confidence, CONF_DECIMALS),
            bbox: candidate.bbox.map(|c| round_to(c, BOX_DECIMALS)),
        }
    }
}

/// Kept detections and their aggregate statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredDetections {
    pub count: usize,
    pub avg_conf: f64,
    pub detections: Vec<Detection>,
}

/// Gate, label, filter and aggregate raw candidates.
///
/// Candidates are visited in detector order and kept in that order. A
/// candidate is kept when its confidence is at least `min_conf` and its label
/// passes `target_classes`. The average is taken over unrounded confidences
/// and rounded once at the end.
pub fn filter_and_aggregate(
    candidates: &[RawCandidate],
    class_names: &ClassNameTable,
    min_conf: MinConfidence,
    target_classes: &TargetClassFilter,
) -> FilteredDetections {
    let threshold = min_conf.value();
    let mut detections = Vec::new();
    let mut conf_sum = 0.0f64;

    for candidate in candidates {
        if candidate.confidence < threshold {
            continue;
        }
        let label = class_names.label_for(candidate.class_id);
        if !target_classes.allows(&label) {
            continue;
        }
        conf_sum += candidate.confidence;
        detections.push(Detection::from_candidate(candidate, label));
    }

    let count = detections.len();
    let avg_conf = if count > 0 {
        round_to(conf_sum / count as f64, CONF_DECIMALS)
    } else {
        0.0
    };

    FilteredDetections {
        count,
        avg_conf,
        detections,
    }
}

/// Response payload of a detection request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub count: usize,
    pub avg_conf: f64,
    pub detections: Vec<Detection>,
    pub inference_ms: u64,
    pub min_conf: f64,
    pub model: String,
}

impl DetectionSummary {
    pub fn from_filtered(
        filtered: FilteredDetections,
        inference_ms: u64,
        min_conf: MinConfidence,
        model: impl Into<String>,
    ) -> Self {
        Self {
            count: filtered.count,
            avg_conf: filtered.avg_conf,
            detections: filtered.detections,
            inference_ms,
            min_conf: min_conf.value(),
            model: model.into(),
        }
    }
}
