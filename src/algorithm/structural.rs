use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::algorithm::{CloneAlgorithm, DetectionParams};
use crate::canon;
use crate::node::{Module, NodeOrigin, NodeWrapper};
use crate::pattern::{unify, PatternNode, PatternValue};
use crate::result::{DetectedClone, DetectionResult};

pub const NAME: &str = "structural";

/// The reference strategy: pairwise unification of same-kind subtrees,
/// weight thresholding, and clustering by canonical dump.
pub struct Structural;

struct Cluster {
    pattern: PatternNode,
    origins: IndexMap<NodeOrigin, f64>,
}

impl CloneAlgorithm for Structural {
    fn name(&self) -> &'static str {
        NAME
    }

    fn detect(&self, modules: &[Module], params: &DetectionParams) -> DetectionResult {
        let units: Vec<&NodeWrapper> = modules.iter().flat_map(|m| m.units.iter()).collect();

        // Discovery order of the cluster map is the tie-break order of the
        // final result, so iteration must be deterministic.
        let mut clusters: IndexMap<String, Cluster> = IndexMap::new();

        for i in 0..units.len() {
            for j in (i + 1)..units.len() {
                compare_pair(units[i], units[j], params, &mut clusters);
            }
        }

        let mut clones: Vec<DetectedClone> = clusters
            .into_iter()
            .map(|(dump, cluster)| DetectedClone {
                value: dump,
                match_weight: cluster.pattern.weight,
                origins: cluster.origins,
            })
            .collect();

        // Stable: equal weights keep first-discovered order.
        clones.sort_by(|a, b| b.match_weight.cmp(&a.match_weight));

        DetectionResult { clones }
    }
}

/// Compare one candidate subtree pair. An accepted match subsumes its
/// substructure and stops the descent; a rejected pair recurses into every
/// same-kind child combination so sub-unit clones are still found.
fn compare_pair(
    a: &NodeWrapper,
    b: &NodeWrapper,
    params: &DetectionParams,
    clusters: &mut IndexMap<String, Cluster>,
) {
    if a.kind == b.kind {
        let pattern = unify(a, b);
        // Thresholding on exact weight: a root hole scores zero, and a
        // pair whose unification is mostly hole never qualifies no matter
        // how large the absorbed subtrees are.
        if pattern.exact_weight() >= params.min_weight {
            record(clusters, pattern, a, b);
            return;
        }
    }

    for ca in &a.children {
        for cb in &b.children {
            // The matched structure can never exceed the smaller subtree.
            if ca.kind == cb.kind && ca.size.min(cb.size) >= params.min_weight {
                compare_pair(ca, cb, params, clusters);
            }
        }
    }
}

/// Merge a provisional clone into the cluster map. Clusters are keyed by
/// canonical dump, so the same skeleton found via different pairs lands in
/// one cluster; merging extends the member list instead of duplicating.
fn record(
    clusters: &mut IndexMap<String, Cluster>,
    pattern: PatternNode,
    a: &NodeWrapper,
    b: &NodeWrapper,
) {
    let dump = canon::type2_dump_pattern(&pattern);
    let sim_a = similarity(&pattern, a);
    let sim_b = similarity(&pattern, b);

    match clusters.entry(dump) {
        Entry::Occupied(mut entry) => {
            let cluster = entry.get_mut();
            if cluster.origins.insert(a.origin.clone(), sim_a).is_none() {
                cluster.pattern.extend(a);
            }
            if cluster.origins.insert(b.origin.clone(), sim_b).is_none() {
                cluster.pattern.extend(b);
            }
        }
        Entry::Vacant(entry) => {
            let mut origins = IndexMap::new();
            origins.insert(a.origin.clone(), sim_a);
            origins.insert(b.origin.clone(), sim_b);
            entry.insert(Cluster { pattern, origins });
        }
    }
}

/// Per-occurrence similarity: the fraction of the occurrence's subtree
/// covered by exact pattern positions. 1.0 when the skeleton matched with
/// no holes; reduced by the share of the subtree that fell inside a hole.
fn similarity(pattern: &PatternNode, node: &NodeWrapper) -> f64 {
    matched_nodes(pattern, node) as f64 / node.size as f64
}

fn matched_nodes(pattern: &PatternNode, node: &NodeWrapper) -> usize {
    match &pattern.value {
        PatternValue::Hole { .. } => 0,
        PatternValue::Exact { .. } => {
            if pattern.children.len() != node.children.len() {
                return 1;
            }
            1 + pattern
                .children
                .iter()
                .zip(&node.children)
                .map(|(pc, nc)| matched_nodes(pc, nc))
                .sum::<usize>()
        }
    }
}
