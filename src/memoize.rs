//! Memoize assembly states by canonical signature.
//!
//! Each distinct signature seen during a search owns one node in a
//! [`PathArena`]. A node remembers the best (largest) number of duplicate
//! bonds with which its state was reached, and the step that reached it, so
//! the best assembly pathway can be replayed by following parent links from
//! any node back to the root.

use std::collections::HashMap;

/// Handle to a node in a [`PathArena`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PathId(usize);

/// One memoized assembly state.
#[derive(Debug, Clone)]
pub struct PathNode {
    pub signature: Vec<usize>,
    pub duplicate_bonds: usize,
    /// Occurrence index of the kept half of the duplicate that led here.
    pub matched: usize,
    /// Occurrence index of the removed half.
    pub removed: usize,
    pub parent: Option<PathId>,
}

/// What [`PathArena::visit`] did with a state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Visit {
    /// The signature had not been seen before.
    New(PathId),
    /// The signature had been reached with fewer duplicate bonds; its node now
    /// records the new route.
    Improved(PathId),
    /// The signature had already been reached at least as cheaply.
    Dominated,
}

#[derive(Debug, Clone)]
pub struct PathArena {
    nodes: Vec<PathNode>,
    index: HashMap<Vec<usize>, PathId>,
}

impl Default for PathArena {
    fn default() -> Self {
        Self::new()
    }
}

impl PathArena {
    /// Create an arena holding only the root, whose signature is empty.
    pub fn new() -> Self {
        let root = PathNode {
            signature: Vec::new(),
            duplicate_bonds: 0,
            matched: 0,
            removed: 0,
            parent: None,
        };
        Self {
            index: HashMap::from([(Vec::new(), PathId(0))]),
            nodes: vec![root],
        }
    }

    pub fn root(&self) -> PathId {
        PathId(0)
    }

    pub fn visit(
        &mut self,
        signature: Vec<usize>,
        duplicate_bonds: usize,
        parent: PathId,
        matched: usize,
        removed: usize,
    ) -> Visit {
        match self.index.get(&signature) {
            Some(&id) => {
                let node = &mut self.nodes[id.0];
                if node.duplicate_bonds >= duplicate_bonds {
                    return Visit::Dominated;
                }
                node.duplicate_bonds = duplicate_bonds;
                node.parent = Some(parent);
                node.matched = matched;
                node.removed = removed;
                Visit::Improved(id)
            }
            None => {
                let id = PathId(self.nodes.len());
                self.index.insert(signature.clone(), id);
                self.nodes.push(PathNode {
                    signature,
                    duplicate_bonds,
                    matched,
                    removed,
                    parent: Some(parent),
                });
                Visit::New(id)
            }
        }
    }

    pub fn node(&self, id: PathId) -> &PathNode {
        &self.nodes[id.0]
    }

    /// Nodes from the root's first child down to `id`.
    pub fn ancestry(&self, id: PathId) -> Vec<&PathNode> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.0];
            if node.parent.is_none() || chain.len() > self.nodes.len() {
                break;
            }
            chain.push(node);
            cursor = node.parent;
        }
        chain.reverse();
        chain
    }

    /// Number of memoized states, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominance() {
        let mut arena = PathArena::new();
        let root = arena.root();

        let Visit::New(a) = arena.visit(vec![0, 1], 2, root, 0, 1) else {
            panic!("first visit should be new");
        };
        assert_eq!(arena.visit(vec![0, 1], 2, root, 0, 2), Visit::Dominated);
        assert_eq!(arena.visit(vec![0, 1], 1, root, 0, 2), Visit::Dominated);
        assert_eq!(arena.node(a).removed, 1);

        let Visit::New(b) = arena.visit(vec![2], 1, root, 0, 0) else {
            panic!("distinct signature should be new");
        };
        assert_eq!(arena.visit(vec![0, 1], 3, b, 1, 2), Visit::Improved(a));
        assert_eq!(arena.node(a).parent, Some(b));
        assert_eq!(arena.node(a).duplicate_bonds, 3);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn ancestry_skips_root() {
        let mut arena = PathArena::new();
        assert!(arena.ancestry(arena.root()).is_empty());

        let Visit::New(a) = arena.visit(vec![0], 1, arena.root(), 0, 1) else {
            panic!();
        };
        let Visit::New(b) = arena.visit(vec![1, 0], 2, a, 2, 3) else {
            panic!();
        };
        let chain: Vec<_> = arena.ancestry(b).iter().map(|n| n.signature.clone()).collect();
        assert_eq!(chain, vec![vec![0], vec![1, 0]]);
    }
}
