//! Groups of isomorphic bond subsets and the duplicate pairs they contain.
//!
//! A [`DuplicateGroup`] collects every enumerated subgraph of one size that
//! shares a canonical id, remembering which fragment of the assembly state
//! each one lies in. Two members form a [`Matching`] (a duplicate pair) when
//! they lie in different fragments or are disjoint within the same fragment.

use bit_set::BitSet;

/// A bond subset found during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The subset's bonds.
    pub mask: BitSet,
    /// Index of the assembly-state fragment containing the subset.
    pub fragment: usize,
    /// Position of the subset within its level of the duplicate DAG.
    pub node: usize,
}

/// A duplicate pair: `kept` stays as a standalone fragment, `removed` is
/// taken out of its fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matching {
    pub kept: BitSet,
    pub removed: BitSet,
    pub kept_fragment: usize,
    pub removed_fragment: usize,
    /// Number of bonds in each half.
    pub size: usize,
}

/// All enumerated subgraphs of one size and one canonical id.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    id: usize,
    size: usize,
    members: Vec<Candidate>,
    coverage: Vec<BitSet>,
    dead: bool,
}

impl DuplicateGroup {
    /// Create an empty group for subgraphs with `size` bonds and canonical id
    /// `id`, in an assembly state with `fragments` fragments.
    pub fn new(id: usize, size: usize, fragments: usize) -> Self {
        Self {
            id,
            size,
            members: Vec::new(),
            coverage: vec![BitSet::new(); fragments],
            dead: true,
        }
    }

    pub fn insert(&mut self, candidate: Candidate) {
        if let Some(cover) = self.coverage.get_mut(candidate.fragment) {
            cover.union_with(&candidate.mask);
        }
        self.members.push(candidate);
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Union of the members' bonds, per fragment.
    pub fn coverage(&self) -> &[BitSet] {
        &self.coverage
    }

    /// Union of all members' bonds.
    pub fn covered(&self) -> BitSet {
        let mut all = BitSet::new();
        for cover in &self.coverage {
            all.union_with(cover);
        }
        all
    }

    /// A group with no live member.
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub(crate) fn mark_alive(&mut self) {
        self.dead = false;
    }

    /// Return `false` if the group cannot possibly hold a duplicate pair.
    ///
    /// Members spread over more than one fragment always can. Members confined
    /// to a single fragment need at least twice the group size in bonds
    /// between them.
    pub fn is_valid(&self) -> bool {
        let mut occupied = self.coverage.iter().filter(|c| !c.is_empty());
        match (occupied.next(), occupied.next()) {
            (Some(_), Some(_)) => true,
            (Some(only), None) => only.len() >= 2 * self.size,
            _ => false,
        }
    }

    fn pairable(a: &Candidate, b: &Candidate) -> bool {
        a.fragment != b.fragment || a.mask.is_disjoint(&b.mask)
    }

    /// Flag each member that belongs to at least one duplicate pair.
    pub fn alive(&self) -> Vec<bool> {
        let mut alive = vec![false; self.members.len()];
        for (i, a) in self.members.iter().enumerate() {
            for (j, b) in self.members.iter().enumerate().skip(i + 1) {
                if Self::pairable(a, b) {
                    alive[i] = true;
                    alive[j] = true;
                }
            }
        }
        alive
    }

    /// Return every duplicate pair in the group. The earlier member of each
    /// pair is the kept half.
    pub fn matchings(&self) -> Vec<Matching> {
        let mut matchings = Vec::new();
        for (i, a) in self.members.iter().enumerate() {
            for b in &self.members[i + 1..] {
                if Self::pairable(a, b) {
                    matchings.push(Matching {
                        kept: a.mask.clone(),
                        removed: b.mask.clone(),
                        kept_fragment: a.fragment,
                        removed_fragment: b.fragment,
                        size: self.size,
                    });
                }
            }
        }
        matchings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(bonds: &[usize], fragment: usize) -> Candidate {
        Candidate {
            mask: BitSet::from_iter(bonds.iter().copied()),
            fragment,
            node: 0,
        }
    }

    #[test]
    fn single_fragment_validity() {
        let mut group = DuplicateGroup::new(0, 2, 1);
        group.insert(candidate(&[0, 1], 0));
        group.insert(candidate(&[1, 2], 0));
        assert!(!group.is_valid());
        assert!(group.matchings().is_empty());
        assert_eq!(group.alive(), vec![false, false]);

        group.insert(candidate(&[3, 4], 0));
        assert!(group.is_valid());
        assert_eq!(group.alive(), vec![true, true, true]);
        let matchings = group.matchings();
        assert_eq!(matchings.len(), 2);
        assert_eq!(matchings[0].kept, BitSet::from_iter([0, 1]));
        assert_eq!(matchings[0].removed, BitSet::from_iter([3, 4]));
        assert_eq!(matchings[1].kept, BitSet::from_iter([1, 2]));
    }

    #[test]
    fn cross_fragment_pairs() {
        let mut group = DuplicateGroup::new(7, 2, 2);
        group.insert(candidate(&[0, 1], 0));
        group.insert(candidate(&[5, 6], 1));
        assert!(group.is_valid());
        assert_eq!(group.alive(), vec![true, true]);

        let matchings = group.matchings();
        assert_eq!(matchings.len(), 1);
        assert_eq!(matchings[0].kept_fragment, 0);
        assert_eq!(matchings[0].removed_fragment, 1);
        assert_eq!(group.covered(), BitSet::from_iter([0, 1, 5, 6]));
    }

    #[test]
    fn groups_start_dead() {
        let mut group = DuplicateGroup::new(0, 3, 1);
        assert!(group.is_dead());
        assert!(!group.is_valid());
        group.mark_alive();
        assert!(!group.is_dead());
    }
}
