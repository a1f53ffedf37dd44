use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lower bound of the effective confidence threshold
pub const MIN_CONFIDENCE_FLOOR: f64 = 0.05;
/// Upper bound of the effective confidence threshold
pub const MIN_CONFIDENCE_CEILING: f64 = 0.95;
/// Threshold used when a request does not carry one
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.25;

/// Mapping from model class id to human-readable label.
///
/// Supplied by the detector on every inference call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNameTable(BTreeMap<i64, String>);

impl ClassNameTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, class_id: i64, label: impl Into<String>) {
        self.0.insert(class_id, label.into());
    }

    pub fn get(&self, class_id: i64) -> Option<&str> {
        self.0.get(&class_id).map(String::as_str)
    }

    /// Label for `class_id`, or its decimal form when the table has no entry.
    pub fn label_for(&self, class_id: i64) -> String {
        match self.get(class_id) {
            Some(label) => label.to_string(),
            None => class_id.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for ClassNameTable {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, label)| (id, label.into())).collect())
    }
}

/// Ordered allow-list of labels that may be returned to clients.
///
/// An empty filter lets every label through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetClassFilter(Vec<String>);

impl TargetClassFilter {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() || kept.iter().any(|k| k == label) {
                continue;
            }
            kept.push(label.to_string());
        }
        Self(kept)
    }

    /// Parse a comma-separated list, e.g. `"olive fly, wasp"`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn allows(&self, label: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|l| l == label)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for TargetClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// Confidence threshold, always inside `[0.05, 0.95]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct MinConfidence(f64);

impl MinConfidence {
    /// Clamp any client value into range. Never fails.
    ///
    /// NaN and +inf land on the ceiling, -inf on the floor.
    pub fn clamped(raw: f64) -> Self {
        if raw.is_nan() {
            return Self(MIN_CONFIDENCE_CEILING);
        }
        Self(raw.clamp(MIN_CONFIDENCE_FLOOR, MIN_CONFIDENCE_CEILING))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for MinConfidence {
    fn default() -> Self {
        Self(DEFAULT_MIN_CONFIDENCE)
    }
}

impl From<f64> for MinConfidence {
    fn from(raw: f64) -> Self {
        Self::clamped(raw)
    }
}
