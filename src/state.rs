use bit_set::BitSet;

use crate::{
    canonize::Canonizer, matches::Matching, memoize::PathId, utils::connected_components,
};

/// A point in the assembly search: the fragments still to be assembled and the
/// bonds saved by the duplicates removed on the way here.
#[derive(Debug, Clone)]
pub struct State {
    fragments: Vec<BitSet>,
    duplicate_bonds: usize,
    ordinal: Option<usize>,
    path: PathId,
    signature: Vec<usize>,
}

impl State {
    /// The initial state: one fragment holding `bonds`, no ordinal and an
    /// empty signature.
    pub fn root(bonds: BitSet, path: PathId) -> Self {
        Self {
            fragments: vec![bonds],
            duplicate_bonds: 0,
            ordinal: None,
            path,
            signature: Vec::new(),
        }
    }

    /// Fragment 0 of every non-root state is the last kept duplicate.
    pub fn fragments(&self) -> &[BitSet] {
        &self.fragments
    }

    pub fn duplicate_bonds(&self) -> usize {
        self.duplicate_bonds
    }

    /// Canonical id of fragment 0; subgraphs with larger ids are not
    /// enumerated from this state.
    pub fn ordinal(&self) -> Option<usize> {
        self.ordinal
    }

    /// Canonical id of fragment 0 followed by the sorted ids of the rest.
    pub fn signature(&self) -> &[usize] {
        &self.signature
    }

    pub fn path(&self) -> PathId {
        self.path
    }

    pub fn set_path(&mut self, path: PathId) {
        self.path = path;
    }

    /// Assembly index of the pathway ending in this state, for a molecule of
    /// `total_bonds` bonds.
    pub fn assembly_index(&self, total_bonds: usize) -> usize {
        total_bonds.saturating_sub(self.duplicate_bonds + 1)
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.fragments.iter().map(BitSet::len).collect()
    }

    /// Drop from each fragment the bonds outside `covered`, the per-fragment
    /// union of all live duplicate pairs.
    pub fn trim(&mut self, covered: &[BitSet]) {
        for (fragment, cover) in self.fragments.iter_mut().zip(covered) {
            fragment.intersect_with(cover);
        }
    }

    /// Apply `matching`: its kept half becomes fragment 0 of the child, its
    /// removed half leaves the assembly, and whatever is left of the touched
    /// fragments is split into connected pieces.
    pub fn fragment(&self, matching: &Matching, canonizer: &mut Canonizer) -> State {
        let mol = canonizer.molecule();
        let (k, r) = (matching.kept_fragment, matching.removed_fragment);

        let mut pieces = vec![matching.kept.clone()];
        let split = |mask: BitSet, pieces: &mut Vec<BitSet>| {
            pieces.extend(
                connected_components(mol, &mask)
                    .into_iter()
                    .filter(|c| c.len() > 1),
            );
        };

        if k == r {
            let mut rest = self.fragments[k].clone();
            rest.difference_with(&matching.kept);
            rest.difference_with(&matching.removed);
            split(rest, &mut pieces);
        } else {
            let mut rest = self.fragments[k].clone();
            rest.difference_with(&matching.kept);
            split(rest, &mut pieces);
            let mut rest = self.fragments[r].clone();
            rest.difference_with(&matching.removed);
            split(rest, &mut pieces);
        }

        for (i, fragment) in self.fragments.iter().enumerate() {
            if i == k || i == r || fragment.is_empty() {
                continue;
            }
            if canonizer.contains(fragment) {
                pieces.push(fragment.clone());
            } else {
                split(fragment.clone(), &mut pieces);
            }
        }

        let mut ids: Vec<usize> = pieces.iter().map(|p| canonizer.canonical_id(p)).collect();
        ids[1..].sort_unstable();

        State {
            ordinal: Some(ids[0]),
            fragments: pieces,
            duplicate_bonds: self.duplicate_bonds + matching.size - 1,
            path: self.path,
            signature: ids,
        }
    }
}
