use std::fmt;

use sha2::{Digest, Sha256};

use crate::node::NodeWrapper;
use crate::pattern::{PatternNode, PatternValue};

/// Deterministic type-2 serialization of a concrete subtree: grammar kinds
/// (including operator/control kinds, which the parser folds into `kind`)
/// are preserved, leaf values are abstracted to `_`. Rename- and
/// literal-invariant, not reorder-invariant.
pub fn type2_dump(node: &NodeWrapper) -> String {
    let mut out = String::with_capacity(node.size * 8);
    push_wrapper(&mut out, node);
    out
}

/// Type-2 serialization of a generalized pattern. A pure function of the
/// skeleton: member lists and node weights never influence the output,
/// except that a hole renders with the weight embedded in its canonical
/// value.
pub fn type2_dump_pattern(pattern: &PatternNode) -> String {
    let mut out = String::new();
    push_pattern(&mut out, pattern);
    out
}

fn push_wrapper(out: &mut String, node: &NodeWrapper) {
    out.push('(');
    out.push_str(&node.kind);
    if node.value.is_some() {
        out.push_str(" _");
    }
    for child in &node.children {
        out.push(' ');
        push_wrapper(out, child);
    }
    out.push(')');
}

fn push_pattern(out: &mut String, pattern: &PatternNode) {
    match &pattern.value {
        PatternValue::Hole { weight } => {
            out.push_str("(hole:");
            out.push_str(&weight.to_string());
            out.push(')');
        }
        PatternValue::Exact { kind, value } => {
            out.push('(');
            out.push_str(kind);
            if value.is_some() || (pattern.children.is_empty() && is_leaf_kind(kind)) {
                out.push_str(" _");
            }
            for child in &pattern.children {
                out.push(' ');
                push_pattern(out, child);
            }
            out.push(')');
        }
    }
}

/// Leaf kinds that carry a value in the concrete tree. Identifiers drop
/// their value during unification, so the pattern side re-adds the `_`
/// placeholder to keep wrapper and pattern dumps aligned.
fn is_leaf_kind(kind: &str) -> bool {
    kind == crate::node::IDENT_KIND || kind.starts_with("Lit")
}

/// Fixed-length content hash of a canonical dump, used as the global
/// deduplication key. A collision between two distinct dumps is treated as
/// identity; at this width that risk is accepted, not detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternDigest([u8; 32]);

impl PatternDigest {
    pub fn of(dump: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(dump.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for PatternDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
