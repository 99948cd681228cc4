use crate::canon::{type2_dump, PatternDigest};
use crate::error::Result;
use crate::node::Module;
use crate::registry::PatternStore;

/// Summary of one extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Subtrees visited and recorded as instances.
    pub instances: usize,
}

/// Intern every subtree of every analyzable unit into the store.
///
/// Each subtree is canonicalized, hashed, interned once per distinct shape,
/// and recorded as a fresh instance at its origin. Repeat occurrences of a
/// shape reuse the interned row; instances are appended unconditionally.
pub fn extract_patterns<S: PatternStore>(
    store: &mut S,
    modules: &[Module],
    commit_id: Option<i64>,
) -> Result<ExtractionStats> {
    let mut instances = 0;

    for module in modules {
        for unit in &module.units {
            for node in unit.descendants() {
                let dump = type2_dump(node);
                let digest = PatternDigest::of(&dump);
                let pattern_id = store.intern_pattern(&dump, &digest, node.size, &node.kind)?;
                store.record_instance(pattern_id, commit_id, &node.origin)?;
                instances += 1;
            }
        }
        tracing::debug!(file = %module.file.display(), "extracted patterns");
    }

    Ok(ExtractionStats { instances })
}
