pub mod types;
pub mod error;
pub mod candidate;
pub mod detection;
pub mod config;

pub use error::{Error, Result};
pub use types::{ClassNameTable, MinConfidence, TargetClassFilter, DEFAULT_MIN_CONFIDENCE};
pub use candidate::{normalize_candidates, normalize_candidates_with, CandidatePolicy, RawBox, RawCandidate, RawValue};
pub use detection::{filter_and_aggregate, Detection, DetectionSummary, FilteredDetections};
pub use config::{LogFormat, ServiceConfig};
