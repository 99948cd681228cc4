use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Grammar kind used for identifier leaves. The parser lowers every
/// referenced name to a leaf of this kind; label collection keys off it.
pub const IDENT_KIND: &str = "Ident";

/// Source location of a concrete node: (file, line, column).
/// Value-semantic so it can key origin maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct NodeOrigin {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl NodeOrigin {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for NodeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A parsed source construct as handed over by the parser: a plain owned
/// tree of grammar kinds with leaf values and per-node origins.
#[derive(Debug, Clone)]
pub struct SourceTree {
    pub kind: String,
    /// Concrete literal/identifier text; `None` for composite nodes.
    pub value: Option<String>,
    pub origin: NodeOrigin,
    pub children: Vec<SourceTree>,
}

impl SourceTree {
    pub fn leaf(kind: impl Into<String>, value: impl Into<String>, origin: NodeOrigin) -> Self {
        Self {
            kind: kind.into(),
            value: Some(value.into()),
            origin,
            children: Vec::new(),
        }
    }

    pub fn branch(kind: impl Into<String>, origin: NodeOrigin, children: Vec<SourceTree>) -> Self {
        Self {
            kind: kind.into(),
            value: None,
            origin,
            children,
        }
    }
}

/// Analysis view over one parsed construct. Wraps the tree with the
/// precomputed facts the engine needs: subtree size (descendant count
/// including self), direct children as wrappers, and the set of identifier
/// names referenced anywhere below.
///
/// Built once per analyzable unit, immutable afterwards. The tree is owned
/// top-down; children are first-generation by construction, so no parent
/// pointers or set-difference pass are needed to derive them.
#[derive(Debug, Clone)]
pub struct NodeWrapper {
    pub kind: String,
    pub value: Option<String>,
    pub origin: NodeOrigin,
    pub children: Vec<NodeWrapper>,
    /// Number of nodes in this subtree, including the root.
    pub size: usize,
    /// Distinct identifier names referenced in this subtree.
    pub labels: BTreeSet<String>,
}

impl NodeWrapper {
    /// Wrap a parsed tree, computing size and labels in a single bottom-up
    /// pass (O(subtree), no per-child re-flattening).
    pub fn build(tree: SourceTree) -> Self {
        let SourceTree {
            kind,
            value,
            origin,
            children,
        } = tree;

        let children: Vec<NodeWrapper> = children.into_iter().map(Self::build).collect();

        let size = 1 + children.iter().map(|c| c.size).sum::<usize>();

        let mut labels = BTreeSet::new();
        if kind == IDENT_KIND {
            if let Some(name) = &value {
                labels.insert(name.clone());
            }
        }
        for child in &children {
            labels.extend(child.labels.iter().cloned());
        }

        Self {
            kind,
            value,
            origin,
            children,
            size,
            labels,
        }
    }

    /// Whether this node carries a concrete leaf value.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Pre-order iterator over every node in this subtree, root first.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

impl fmt::Display for NodeWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{} children; {} labels]",
            self.kind,
            self.children.len(),
            self.labels.len()
        )
    }
}

/// Pre-order traversal over a wrapper subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a NodeWrapper>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a NodeWrapper;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push in reverse so children come out in order.
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

/// All analyzable units extracted from one source file.
#[derive(Debug, Clone)]
pub struct Module {
    pub file: PathBuf,
    pub units: Vec<NodeWrapper>,
}
