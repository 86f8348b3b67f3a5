use std::collections::HashMap;

use bit_set::BitSet;
use petgraph::{graph::EdgeIndex, unionfind::UnionFind};

use crate::molecule::{MGraph, Molecule};

/// Return the atoms touched by the bonds in `mask`.
pub(crate) fn atoms_of(g: &MGraph, mask: &BitSet) -> BitSet {
    let mut atoms = BitSet::with_capacity(g.node_count());
    for e in mask {
        if let Some((src, dst)) = g.edge_endpoints(EdgeIndex::new(e)) {
            atoms.insert(src.index());
            atoms.insert(dst.index());
        }
    }
    atoms
}

/// Split the bonds in `mask` into maximal connected components.
///
/// Components are returned in order of their lowest bond index. Their union is
/// exactly `mask` and they are pairwise disjoint; single-bond components are
/// kept.
pub fn connected_components(mol: &Molecule, mask: &BitSet) -> Vec<BitSet> {
    let g = mol.graph();
    let mut atoms = UnionFind::<usize>::new(g.node_count());
    let mut endpoints = Vec::with_capacity(mask.len());
    for e in mask {
        if let Some((src, dst)) = g.edge_endpoints(EdgeIndex::new(e)) {
            atoms.union(src.index(), dst.index());
            endpoints.push((e, src));
        }
    }

    let mut slot = HashMap::<usize, usize>::new();
    let mut components: Vec<BitSet> = Vec::new();
    for (e, src) in endpoints {
        let root = atoms.find_mut(src.index());
        let ix = *slot.entry(root).or_insert_with(|| {
            components.push(BitSet::with_capacity(g.edge_count()));
            components.len() - 1
        });
        components[ix].insert(e);
    }
    components
}

/// Return `true` iff the bonds in `mask` form one connected subgraph.
pub fn is_connected(mol: &Molecule, mask: &BitSet) -> bool {
    connected_components(mol, mask).len() == 1
}

/// Return the atom pair of every bond in `mask`, in bond order.
pub(crate) fn atom_pairs(g: &MGraph, mask: &BitSet) -> Vec<[usize; 2]> {
    mask.iter()
        .filter_map(|e| g.edge_endpoints(EdgeIndex::new(e)))
        .map(|(a, b)| [a.index(), b.index()])
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::molecule::{Bond, Element};

    // Two separate propane chains: bonds 0-1 and 2-3.
    fn two_chains() -> Molecule {
        let mut mol = Molecule::new();
        let atoms: Vec<_> = (0..6).map(|_| mol.add_atom(Element::Carbon)).collect();
        mol.add_bond(atoms[0], atoms[1], Bond::Single);
        mol.add_bond(atoms[1], atoms[2], Bond::Single);
        mol.add_bond(atoms[3], atoms[4], Bond::Single);
        mol.add_bond(atoms[4], atoms[5], Bond::Single);
        mol
    }

    #[test]
    fn split_partitions_mask() {
        let mol = two_chains();
        let mask = mol.all_bonds();
        let parts = connected_components(&mol, &mask);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], BitSet::from_iter([0, 1]));
        assert_eq!(parts[1], BitSet::from_iter([2, 3]));
        assert!(parts.iter().all(|p| is_connected(&mol, p)));
        assert!(!is_connected(&mol, &mask));
    }

    #[test]
    fn split_keeps_single_bonds() {
        let mol = two_chains();
        let mask = BitSet::from_iter([0, 3]);
        let parts = connected_components(&mol, &mask);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.len() == 1));
        assert!(connected_components(&mol, &BitSet::new()).is_empty());
    }

    #[test]
    fn split_random_masks() {
        let mut rng = StdRng::seed_from_u64(0xb0b);
        for _ in 0..200 {
            // A random tree with a few ring-closing bonds.
            let mut mol = Molecule::new();
            let n = rng.gen_range(2..=12);
            let atoms: Vec<_> = (0..n).map(|_| mol.add_atom(Element::Carbon)).collect();
            let mut pairs = Vec::new();
            for i in 1..n {
                pairs.push((rng.gen_range(0..i), i));
            }
            for _ in 0..rng.gen_range(0..=3) {
                let (a, b) = (rng.gen_range(0..n), rng.gen_range(0..n));
                if a != b && !pairs.contains(&(a, b)) && !pairs.contains(&(b, a)) {
                    pairs.push((a, b));
                }
            }
            for &(a, b) in &pairs {
                mol.add_bond(atoms[a], atoms[b], Bond::Single);
            }
            assert!(!mol.is_malformed());

            let mask: BitSet = (0..mol.bond_count()).filter(|_| rng.gen_bool(0.5)).collect();
            let parts = connected_components(&mol, &mask);

            let mut union = BitSet::new();
            for (i, part) in parts.iter().enumerate() {
                assert!(is_connected(&mol, part));
                for other in &parts[i + 1..] {
                    assert!(part.is_disjoint(other));
                    assert!(atoms_of(mol.graph(), part).is_disjoint(&atoms_of(mol.graph(), other)));
                }
                union.union_with(part);
            }
            assert_eq!(union, mask);
        }
    }
}
