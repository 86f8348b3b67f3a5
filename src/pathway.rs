//! Reconstruct and serialize the best assembly pathway found by a search.

use bit_set::BitSet;
use serde::{Deserialize, Serialize};

use crate::{
    canonize::Canonizer,
    memoize::{PathArena, PathId},
    molecule::Molecule,
    utils::{atom_pairs, atoms_of},
};

/// A molecular graph (or part of one) as plain vertex and edge lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDescription {
    #[serde(rename = "Vertices")]
    pub vertices: Vec<usize>,
    #[serde(rename = "Edges")]
    pub edges: Vec<[usize; 2]>,
    #[serde(rename = "VertexColours")]
    pub vertex_colours: Vec<String>,
    #[serde(rename = "EdgeColours")]
    pub edge_colours: Vec<String>,
}

impl GraphDescription {
    /// Describe the bonds of `mol` in `mask` and the atoms they touch. With
    /// `all_atoms`, isolated atoms are listed too.
    fn of(mol: &Molecule, mask: &BitSet, all_atoms: bool) -> Self {
        let g = mol.graph();
        let atoms = if all_atoms {
            BitSet::from_iter(0..mol.atom_count())
        } else {
            atoms_of(g, mask)
        };
        let vertices: Vec<usize> = atoms.iter().collect();
        let vertex_colours = vertices
            .iter()
            .filter_map(|&v| mol.element(v))
            .map(|e| e.to_string())
            .collect();
        let edge_colours = mask
            .iter()
            .filter_map(|e| mol.bond(e))
            .map(|(_, _, bond)| bond.to_string())
            .collect();
        Self {
            vertices,
            edges: atom_pairs(g, mask),
            vertex_colours,
            edge_colours,
        }
    }
}

/// One duplicate along the pathway: `left` stays, `right` is reused from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatePair {
    #[serde(rename = "Left")]
    pub left: Vec<[usize; 2]>,
    #[serde(rename = "Right")]
    pub right: Vec<[usize; 2]>,
}

/// The best assembly pathway of a molecule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pathway {
    pub file_graph: GraphDescription,
    pub remnant: GraphDescription,
    pub duplicates: Vec<DuplicatePair>,
    pub removed_edges: Vec<[usize; 2]>,
}

/// Replay the arena from `best` back to the root.
///
/// `input` is the molecule as searched (after hydrogen removal), `target` the
/// same molecule without its `unique` bonds; the canonizer holds the masks of
/// `target` that the search used.
pub fn reconstruct(
    input: &Molecule,
    target: &Molecule,
    unique: &[usize],
    arena: &PathArena,
    best: PathId,
    canonizer: &Canonizer,
) -> Pathway {
    let tg = target.graph();
    let mut taken = BitSet::new();
    let mut duplicates = Vec::new();
    for node in arena.ancestry(best) {
        let Some(&class) = node.signature.first() else {
            continue;
        };
        let (Some(kept), Some(removed)) = (
            canonizer.occurrence(class, node.matched),
            canonizer.occurrence(class, node.removed),
        ) else {
            continue;
        };
        taken.union_with(removed);
        duplicates.push(DuplicatePair {
            left: atom_pairs(tg, kept),
            right: atom_pairs(tg, removed),
        });
    }

    let mut remnant = target.all_bonds();
    remnant.difference_with(&taken);

    Pathway {
        file_graph: GraphDescription::of(input, &input.all_bonds(), true),
        remnant: GraphDescription::of(target, &remnant, false),
        duplicates,
        removed_edges: atom_pairs(input.graph(), &BitSet::from_iter(unique.iter().copied())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memoize::Visit,
        molecule::{Bond, Element},
    };

    #[test]
    fn replay_one_duplicate() {
        let mut mol = Molecule::new();
        let atoms: Vec<usize> = (0..5).map(|_| mol.add_atom(Element::Carbon)).collect();
        for w in atoms.windows(2) {
            mol.add_bond(w[0], w[1], Bond::Single);
        }

        let mut canonizer = Canonizer::new(&mol);
        let kept = BitSet::from_iter([0, 1]);
        let removed = BitSet::from_iter([2, 3]);
        let class = canonizer.canonical_id(&kept);
        assert_eq!(canonizer.canonical_id(&removed), class);

        let mut arena = PathArena::new();
        let Visit::New(best) = arena.visit(vec![class, class], 1, arena.root(), 0, 1) else {
            panic!("fresh arena");
        };

        let pathway = reconstruct(&mol, &mol, &[], &arena, best, &canonizer);
        assert_eq!(pathway.file_graph.vertices, vec![0, 1, 2, 3, 4]);
        assert_eq!(pathway.file_graph.edge_colours, vec!["single"; 4]);
        assert_eq!(pathway.file_graph.vertex_colours, vec!["C"; 5]);
        assert_eq!(
            pathway.duplicates,
            vec![DuplicatePair {
                left: vec![[0, 1], [1, 2]],
                right: vec![[2, 3], [3, 4]],
            }]
        );
        assert_eq!(pathway.remnant.edges, vec![[0, 1], [1, 2]]);
        assert_eq!(pathway.remnant.vertices, vec![0, 1, 2]);
        assert!(pathway.removed_edges.is_empty());

        let json = serde_json::to_value(&pathway).unwrap();
        assert!(json["file_graph"]["VertexColours"].is_array());
        assert!(json["duplicates"][0]["Left"].is_array());
    }
}
