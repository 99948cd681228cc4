use indexmap::IndexMap;

use crate::node::NodeOrigin;

/// One cluster of occurrences sharing a canonical structural pattern.
#[derive(Debug, Clone)]
pub struct DetectedClone {
    /// Canonical dump of the shared pattern.
    pub value: String,
    /// Structural significance of the matched pattern.
    pub match_weight: usize,
    /// Every concrete occurrence, with how closely it matches the pattern.
    /// Insertion order records discovery order.
    pub origins: IndexMap<NodeOrigin, f64>,
}

/// Ordered clusters produced by one detection run over one snapshot.
#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
    pub clones: Vec<DetectedClone>,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.clones.is_empty()
    }
}
