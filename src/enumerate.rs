//! Enumerate duplicatable subgraphs level by level.
//!
//! The first (cold) pass grows connected subgraphs one bond at a time from
//! every single bond of the molecule, grouping each size by canonical id and
//! growing only subgraphs that have an isomorphic, non-overlapping partner.
//! Every subgraph is generated once, by the first parent that reaches it; the
//! parent-to-child links are kept in a [`Dag`].
//!
//! Later (warm) passes never re-derive neighborhoods. They walk the DAG from
//! single bonds, keeping only children that still lie inside a fragment of
//! the current assembly state and whose canonical id does not exceed the
//! state's ordinal.

use std::collections::{BTreeMap, HashSet};

use bit_set::BitSet;
use log::debug;
use petgraph::graph::EdgeIndex;

use crate::{
    canonize::Canonizer,
    interrupt::Interrupt,
    matches::{Candidate, DuplicateGroup},
    molecule::Molecule,
    utils::atoms_of,
};

/// Duplicate groups of one subgraph size, in canonical id order.
pub type Level = BTreeMap<usize, DuplicateGroup>;

/// Why an enumeration pass stopped before finishing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Halt {
    /// The search was cancelled or ran out of time.
    Cancelled,
    /// More distinct subgraphs were canonized than allowed.
    Capped,
}

/// A subgraph in the duplicate DAG.
#[derive(Debug, Clone)]
pub struct DagNode {
    mask: BitSet,
    canonical_id: Option<usize>,
    children: Vec<usize>,
}

impl DagNode {
    pub fn mask(&self) -> &BitSet {
        &self.mask
    }

    /// Canonical id of the subgraph; `None` for single bonds.
    pub fn canonical_id(&self) -> Option<usize> {
        self.canonical_id
    }

    /// Positions of this node's one-bond extensions in the next level.
    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

/// Subgraphs discovered by the cold pass, by size, with links from each
/// subgraph to the one-bond-larger subgraphs it generated.
///
/// `levels()[s - 1]` holds the subgraphs with `s` bonds; level 0 has one node
/// per bond, at the bond's index.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    levels: Vec<Vec<DagNode>>,
}

impl Dag {
    pub fn levels(&self) -> &[Vec<DagNode>] {
        &self.levels
    }

    pub fn node_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Add the DAG children of `parent` (a subgraph of `size` bonds) that lie
    /// inside `fragment` to the groups in `out`. Children whose canonical id
    /// exceeds `limit` are skipped; return `true` if there were any.
    fn extend(
        &self,
        parent: &Candidate,
        size: usize,
        fragment: &BitSet,
        limit: usize,
        out: &mut Level,
        fragments: usize,
    ) -> bool {
        let (Some(parents), Some(children)) = (self.levels.get(size - 1), self.levels.get(size))
        else {
            return false;
        };
        let Some(node) = parents.get(parent.node) else {
            return false;
        };

        let mut overweight = false;
        for &c in &node.children {
            let Some(child) = children.get(c) else {
                continue;
            };
            let Some(id) = child.canonical_id else {
                continue;
            };
            if !child.mask.is_subset(fragment) {
                continue;
            }
            if id <= limit {
                out.entry(id)
                    .or_insert_with(|| DuplicateGroup::new(id, size + 1, fragments))
                    .insert(Candidate {
                        mask: child.mask.clone(),
                        fragment: parent.fragment,
                        node: c,
                    });
            } else {
                overweight = true;
            }
        }
        overweight
    }
}

/// Result of a warm pass.
#[derive(Debug, Clone)]
pub struct Enumeration {
    /// Duplicate groups; `levels[k]` holds subgraphs with `k + 2` bonds.
    pub levels: Vec<Level>,
    /// Per level, per fragment: the union of all live candidates.
    pub covered: Vec<Vec<BitSet>>,
    /// Largest subgraph size examined.
    pub max_size: usize,
}

/// A subgraph being grown during the cold pass.
struct Grower {
    mask: BitSet,
    atoms: BitSet,
    fragment: usize,
    node: usize,
}

/// Parent-to-child links recorded during the cold pass, addressed by
/// position within each level.
type TempDag = Vec<Vec<(BitSet, Vec<usize>)>>;

/// Push every connected one-bond extension of `parent` inside `fragment` that
/// no other parent has produced yet.
fn grow(
    mol: &Molecule,
    parent: &Grower,
    fragment: &BitSet,
    seen: &mut HashSet<BitSet>,
    temp: &mut TempDag,
    out: &mut Vec<Grower>,
) {
    let g = mol.graph();
    let level = parent.mask.len();
    for e in fragment.difference(&parent.mask) {
        let Some((a, b)) = g.edge_endpoints(EdgeIndex::new(e)) else {
            continue;
        };
        if !parent.atoms.contains(a.index()) && !parent.atoms.contains(b.index()) {
            continue;
        }

        let mut mask = parent.mask.clone();
        mask.insert(e);
        if !seen.insert(mask.clone()) {
            continue;
        }
        let mut atoms = parent.atoms.clone();
        atoms.insert(a.index());
        atoms.insert(b.index());

        if temp.len() <= level {
            temp.resize_with(level + 1, Vec::new);
        }
        let node = temp[level].len();
        temp[level].push((mask.clone(), Vec::new()));
        temp[level - 1][parent.node].1.push(node);

        out.push(Grower {
            mask,
            atoms,
            fragment: parent.fragment,
            node,
        });
    }
}

/// Run the cold pass over `fragments` and build the [`Dag`].
///
/// Fails with [`Halt::Capped`] once the canonizer holds more than `enum_max`
/// masks, or with [`Halt::Cancelled`] if `interrupt` trips.
pub(crate) fn cold_enumeration(
    mol: &Molecule,
    fragments: &[BitSet],
    canonizer: &mut Canonizer,
    enum_max: usize,
    interrupt: &mut Interrupt,
) -> Result<(Dag, Vec<Level>), Halt> {
    let g = mol.graph();
    let mut temp: TempDag = vec![(0..mol.bond_count())
        .map(|e| (BitSet::from_iter([e]), Vec::new()))
        .collect()];
    let mut seen = HashSet::new();

    // Size-two subgraphs, grown from every single bond.
    let mut current = Vec::new();
    for (f, fragment) in fragments.iter().enumerate() {
        for e in fragment {
            let mask = BitSet::from_iter([e]);
            let single = Grower {
                atoms: atoms_of(g, &mask),
                mask,
                fragment: f,
                node: e,
            };
            grow(mol, &single, fragment, &mut seen, &mut temp, &mut current);
        }
    }

    let mut levels = Vec::new();
    let mut size = 2;
    while !current.is_empty() {
        let mut level = Level::new();
        for grower in &current {
            if interrupt.poll() {
                return Err(Halt::Cancelled);
            }
            if canonizer.len() > enum_max {
                return Err(Halt::Capped);
            }
            let id = canonizer.canonical_id(&grower.mask);
            level
                .entry(id)
                .or_insert_with(|| DuplicateGroup::new(id, size, fragments.len()))
                .insert(Candidate {
                    mask: grower.mask.clone(),
                    fragment: grower.fragment,
                    node: grower.node,
                });
        }

        // Positions in `current` match positions in the temporary DAG level.
        let mut next = Vec::new();
        for group in level.values_mut() {
            if interrupt.poll() {
                return Err(Halt::Cancelled);
            }
            if !group.is_valid() {
                continue;
            }
            let mut any_alive = false;
            for (member, alive) in group.members().iter().zip(group.alive()) {
                if alive {
                    any_alive = true;
                    grow(
                        mol,
                        &current[member.node],
                        &fragments[member.fragment],
                        &mut seen,
                        &mut temp,
                        &mut next,
                    );
                }
            }
            if any_alive {
                group.mark_alive();
            }
            if canonizer.len() > enum_max.saturating_sub(next.len()) {
                return Err(Halt::Capped);
            }
        }

        debug!(
            "cold enumeration: size {size}, {} groups, {} subgraphs to grow",
            level.len(),
            next.len()
        );
        levels.push(level);
        current = next;
        size += 1;
    }

    Ok((compact(temp, canonizer), levels))
}

/// Turn the temporary DAG into index-addressed levels, dropping links to
/// nodes that were never canonized and any empty trailing levels.
fn compact(temp: TempDag, canonizer: &Canonizer) -> Dag {
    let remap: Vec<Vec<Option<usize>>> = temp
        .iter()
        .enumerate()
        .map(|(l, nodes)| {
            let mut kept = 0;
            nodes
                .iter()
                .map(|(mask, _)| {
                    (l == 0 || canonizer.contains(mask)).then(|| {
                        kept += 1;
                        kept - 1
                    })
                })
                .collect()
        })
        .collect();

    let mut levels: Vec<Vec<DagNode>> = Vec::with_capacity(temp.len());
    for (l, nodes) in temp.into_iter().enumerate() {
        let mut level = Vec::with_capacity(nodes.len());
        for (i, (mask, children)) in nodes.into_iter().enumerate() {
            if remap[l][i].is_none() {
                continue;
            }
            let children = children
                .into_iter()
                .filter_map(|c| remap.get(l + 1).and_then(|m| m.get(c).copied().flatten()))
                .collect();
            let canonical_id = if l == 0 { None } else { canonizer.lookup(&mask) };
            level.push(DagNode {
                mask,
                canonical_id,
                children,
            });
        }
        levels.push(level);
    }
    while levels.len() > 1 && levels.last().is_some_and(Vec::is_empty) {
        levels.pop();
    }
    Dag { levels }
}

/// Run a warm pass over `fragments`, following links in `dag`.
///
/// Only subgraphs whose canonical id is at most `ordinal` are enumerated. As
/// soon as one level meets a larger id, exactly one more level is examined.
pub(crate) fn warm_enumeration(
    dag: &Dag,
    fragments: &[BitSet],
    ordinal: Option<usize>,
    interrupt: &mut Interrupt,
) -> Result<Enumeration, Halt> {
    let limit = ordinal.unwrap_or(usize::MAX);
    let n = fragments.len();

    let mut first = Level::new();
    for (f, fragment) in fragments.iter().enumerate() {
        for e in fragment {
            let single = Candidate {
                mask: BitSet::from_iter([e]),
                fragment: f,
                node: e,
            };
            dag.extend(&single, 1, fragment, limit, &mut first, n);
        }
    }

    let mut levels = vec![first];
    let mut covered = Vec::new();
    let mut size = 1;
    let mut overweight = false;
    let mut last = false;
    let mut active = true;
    while active {
        active = false;
        let mut taken = vec![BitSet::new(); n];
        let mut next = Level::new();
        if let Some(current) = levels.last_mut() {
            for group in current.values_mut() {
                if interrupt.poll() {
                    return Err(Halt::Cancelled);
                }
                if !group.is_valid() {
                    continue;
                }
                let mut any_alive = false;
                for (member, alive) in group.members().iter().zip(group.alive()) {
                    if !alive {
                        continue;
                    }
                    any_alive = true;
                    taken[member.fragment].union_with(&member.mask);
                    if !last {
                        overweight |= dag.extend(
                            member,
                            group.size(),
                            &fragments[member.fragment],
                            limit,
                            &mut next,
                            n,
                        );
                        active = true;
                    }
                }
                if any_alive {
                    group.mark_alive();
                }
            }
        }
        if overweight {
            last = true;
        }
        covered.push(taken);
        levels.push(next);
        size += 1;
    }
    if levels.last().is_some_and(Level::is_empty) {
        levels.pop();
    }

    Ok(Enumeration {
        levels,
        covered,
        max_size: size,
    })
}
