pub mod structural;

use crate::error::{Error, Result};
use crate::node::Module;
use crate::result::DetectionResult;

/// Tuning knobs shared by all strategies.
#[derive(Debug, Clone)]
pub struct DetectionParams {
    /// Minimum unified weight for a pair to count as a clone; filters out
    /// trivial single-token matches.
    pub min_weight: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self { min_weight: 10 }
    }
}

/// A named clone detection strategy. Implementations are pure: no I/O, no
/// shared state, always an answer for well-formed input.
pub trait CloneAlgorithm {
    fn name(&self) -> &'static str;
    fn detect(&self, modules: &[Module], params: &DetectionParams) -> DetectionResult;
}

/// Look up a registered strategy by name.
pub fn algorithm_for(name: &str) -> Option<Box<dyn CloneAlgorithm>> {
    match name {
        structural::NAME => Some(Box::new(structural::Structural)),
        _ => None,
    }
}

/// Run the named strategy over one snapshot's modules.
pub fn run_detection(
    modules: &[Module],
    strategy: &str,
    params: &DetectionParams,
) -> Result<DetectionResult> {
    let algorithm = algorithm_for(strategy)
        .ok_or_else(|| Error::UnsupportedStrategy(strategy.to_string()))?;
    tracing::debug!(strategy = algorithm.name(), modules = modules.len(), "running detection");
    Ok(algorithm.detect(modules, params))
}
