// Ingestion of detector output into plain scalar candidates

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A detector field that may arrive as a bare number or as a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Scalar(f64),
    List(Vec<f64>),
}

impl RawValue {
    /// The scalar carried by a bare number or a single-element sequence.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            RawValue::Scalar(v) => Some(*v),
            RawValue::List(values) if values.len() == 1 => Some(values[0]),
            RawValue::List(_) => None,
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Scalar(v)
    }
}

impl From<Vec<f64>> for RawValue {
    fn from(v: Vec<f64>) -> Self {
        RawValue::List(v)
    }
}

/// One box as handed over by a detector backend, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBox {
    pub cls: RawValue,
    pub conf: RawValue,
    pub xyxy: Vec<f64>,
}

/// Unfiltered detection with plain scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub class_id: i64,
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in source image pixels
    pub bbox: [f64; 4],
}

impl RawCandidate {
    pub fn new(class_id: i64, confidence: f64, bbox: [f64; 4]) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// What to do with a raw box whose fields cannot be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidatePolicy {
    /// Drop the box and keep going.
    #[default]
    Lenient,
    /// Fail the whole batch.
    Strict,
}

impl RawBox {
    pub fn to_candidate(&self) -> std::result::Result<RawCandidate, String> {
        let confidence = self
            .conf
            .as_scalar()
            .ok_or_else(|| format!("confidence has shape {:?}", self.conf))?;
        if !confidence.is_finite() {
            return Err(format!("confidence is not finite: {}", confidence));
        }

        let class = self
            .cls
            .as_scalar()
            .ok_or_else(|| format!("class id has shape {:?}", self.cls))?;
        if !class.is_finite() {
            return Err(format!("class id is not finite: {}", class));
        }

        let bbox: [f64; 4] = self
            .xyxy
            .as_slice()
            .try_into()
            .map_err(|_| format!("box has {} coordinates", self.xyxy.len()))?;
        if bbox.iter().any(|c| !c.is_finite()) {
            return Err("box has a non-finite coordinate".to_string());
        }

        Ok(RawCandidate {
            class_id: class.trunc() as i64,
            confidence,
            bbox,
        })
    }
}

/// Normalize raw boxes, silently dropping the malformed ones.
pub fn normalize_candidates(boxes: &[RawBox]) -> Vec<RawCandidate> {
    boxes
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| match raw.to_candidate() {
            Ok(candidate) => Some(candidate),
            Err(reason) => {
                debug!("Skipping malformed candidate {}: {}", index, reason);
                None
            }
        })
        .collect()
}

/// Normalize raw boxes under an explicit policy.
pub fn normalize_candidates_with(
    boxes: &[RawBox],
    policy: CandidatePolicy,
) -> Result<Vec<RawCandidate>> {
    match policy {
        CandidatePolicy::Lenient => Ok(normalize_candidates(boxes)),
        CandidatePolicy::Strict => boxes
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                raw.to_candidate()
                    .map_err(|reason| Error::MalformedCandidate { index, reason })
            })
            .collect(),
    }
}
