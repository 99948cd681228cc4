use std::fmt;

use crate::node::{NodeOrigin, NodeWrapper};

/// Canonical value of one pattern position: either the concrete kind/value
/// shared by every member occurrence, or a hole absorbing a mismatched
/// subtree. The hole carries its weight so that holes of different extent
/// compare unequal, as in the skeleton equality rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternValue {
    Exact {
        kind: String,
        value: Option<String>,
    },
    Hole {
        weight: usize,
    },
}

impl PatternValue {
    pub fn is_hole(&self) -> bool {
        matches!(self, PatternValue::Hole { .. })
    }
}

impl fmt::Display for PatternValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternValue::Exact { kind, value: None } => write!(f, "{kind}"),
            PatternValue::Exact {
                kind,
                value: Some(v),
            } => write!(f, "{kind}={v}"),
            PatternValue::Hole { weight } => write!(f, "Hole(weight={weight})"),
        }
    }
}

/// Generalization of two or more structurally-similar subtrees.
///
/// `members` and `weight` are provenance/metadata; equality is the skeleton
/// only (`value` plus `children`, recursively), so independently discovered
/// instances of the same pattern compare equal regardless of where they
/// were found.
#[derive(Debug, Clone)]
pub struct PatternNode {
    /// Origins of the concrete occurrences generalized at this position.
    pub members: Vec<NodeOrigin>,
    /// Structural significance of the generalized subtree.
    pub weight: usize,
    pub value: PatternValue,
    pub children: Vec<PatternNode>,
}

impl PartialEq for PatternNode {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.children == other.children
    }
}

impl Eq for PatternNode {}

impl PatternNode {
    /// Append another occurrence without altering the skeleton. The caller
    /// must have verified structural equality beforehand.
    pub fn extend(&mut self, node: &NodeWrapper) {
        self.members.push(node.origin.clone());
    }

    /// Whether any position in this pattern is a hole.
    pub fn has_holes(&self) -> bool {
        self.value.is_hole() || self.children.iter().any(PatternNode::has_holes)
    }

    /// Weight of the matched structure only: one unit per exact position,
    /// nothing for holes. `weight` counts absorbed subtrees too, so this is
    /// the measure that tells a real match from a large mismatch.
    pub fn exact_weight(&self) -> usize {
        match &self.value {
            PatternValue::Hole { .. } => 0,
            PatternValue::Exact { .. } => {
                1 + self
                    .children
                    .iter()
                    .map(PatternNode::exact_weight)
                    .sum::<usize>()
            }
        }
    }
}

/// A unification operand: either a concrete wrapper or an already-built
/// pattern, so patterns can be unified transitively.
#[derive(Clone, Copy)]
pub enum Operand<'a> {
    Node(&'a NodeWrapper),
    Pattern(&'a PatternNode),
}

impl<'a> Operand<'a> {
    fn size(&self) -> usize {
        match self {
            Operand::Node(n) => n.size,
            Operand::Pattern(p) => p.weight,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Operand::Node(n) => n.children.len(),
            Operand::Pattern(p) => p.children.len(),
        }
    }

    fn child(&self, i: usize) -> Operand<'a> {
        match self {
            Operand::Node(n) => Operand::Node(&n.children[i]),
            Operand::Pattern(p) => Operand::Pattern(&p.children[i]),
        }
    }

    fn origins(&self) -> Vec<NodeOrigin> {
        match self {
            Operand::Node(n) => vec![n.origin.clone()],
            Operand::Pattern(p) => p.members.clone(),
        }
    }

    fn exact_value(&self) -> Option<PatternValue> {
        match self {
            // Identifier names are rename-invariant at the type-2 level:
            // two identifiers always unify by kind alone. Literal values
            // stay significant and diverge into holes.
            Operand::Node(n) => Some(PatternValue::Exact {
                kind: n.kind.clone(),
                value: if n.kind == crate::node::IDENT_KIND {
                    None
                } else {
                    n.value.clone()
                },
            }),
            Operand::Pattern(p) => match &p.value {
                PatternValue::Exact { .. } => Some(p.value.clone()),
                PatternValue::Hole { .. } => None,
            },
        }
    }
}

/// Unify two concrete subtrees into a pattern.
pub fn unify(a: &NodeWrapper, b: &NodeWrapper) -> PatternNode {
    unify_operands(Operand::Node(a), Operand::Node(b))
}

/// Unify two previously built patterns.
pub fn unify_patterns(a: &PatternNode, b: &PatternNode) -> PatternNode {
    unify_operands(Operand::Pattern(a), Operand::Pattern(b))
}

/// Total unification: always produces a pattern, never fails. Positions
/// where the operands disagree in kind, value, or child count become holes
/// that absorb the entire mismatched subtree; everything else recurses
/// pairwise, accumulating one unit of weight per matched node.
pub fn unify_operands(a: Operand<'_>, b: Operand<'_>) -> PatternNode {
    let mut members = a.origins();
    members.extend(b.origins());

    let shared = match (a.exact_value(), b.exact_value()) {
        (Some(va), Some(vb)) if va == vb => Some(va),
        _ => None,
    };

    if let Some(value) = shared {
        if a.arity() == b.arity() {
            let children: Vec<PatternNode> = (0..a.arity())
                .map(|i| unify_operands(a.child(i), b.child(i)))
                .collect();
            let weight = 1 + children.iter().map(|c| c.weight).sum::<usize>();
            return PatternNode {
                members,
                weight,
                value,
                children,
            };
        }
    }

    // Mismatch: the hole swallows the larger operand whole rather than
    // exposing partial structure beneath a diverging position.
    let weight = a.size().max(b.size());
    PatternNode {
        members,
        weight,
        value: PatternValue::Hole { weight },
        children: Vec::new(),
    }
}
