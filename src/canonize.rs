//! Assign canonical ids to connected bond subsets.
//!
//! Two bond subsets receive the same id iff their edge-induced subgraphs are
//! isomorphic as labeled graphs (atom elements and bond orders must agree).
//! Trees are identified exactly by a centroid-rooted canonical string. Graphs
//! with cycles are bucketed by an iteratively refined vertex hash, and every
//! bucket hit is confirmed with an exact isomorphism test before an id is
//! shared.
//!
//! Ids are minted in discovery order, starting at 0. The assembly search uses
//! this order as a total order on isomorphism classes, so a [`Canonizer`] must
//! live for a whole calculation.

use std::collections::HashMap;

use bit_set::BitSet;
use petgraph::{
    algo::is_isomorphic_matching,
    graph::{EdgeIndex, EdgeReference, Graph, NodeIndex},
    unionfind::UnionFind,
    visit::EdgeRef,
    Undirected,
};

use crate::molecule::{Bond, Element, Index, Molecule};

/// Maximum number of refinement rounds in the cyclic subgraph hash.
const HASH_DEPTH_MAX: usize = 7;

/// Scale applied to neighbor contributions in each refinement round.
const DEPTH_FACTOR: f64 = 0.33;

/// An edge-induced subgraph with local vertex numbering.
type LGraph = Graph<Element, Bond, Undirected, Index>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Tree(String),
    Cyclic { atoms: usize, bonds: usize, hash: i32 },
}

#[derive(Debug)]
struct Class {
    occurrences: Vec<BitSet>,
    representative: Option<LGraph>,
}

/// Memoized isomorphism oracle over the bond subsets of one molecule.
pub struct Canonizer<'a> {
    mol: &'a Molecule,
    masks: HashMap<BitSet, (usize, usize)>,
    classes: Vec<Class>,
    keys: HashMap<Key, Vec<usize>>,
    atom_weights: HashMap<Element, f64>,
}

impl<'a> Canonizer<'a> {
    pub fn new(mol: &'a Molecule) -> Self {
        Self {
            mol,
            masks: HashMap::new(),
            classes: Vec::new(),
            keys: HashMap::new(),
            atom_weights: HashMap::new(),
        }
    }

    /// The molecule whose bonds the masks refer to.
    pub fn molecule(&self) -> &'a Molecule {
        self.mol
    }

    /// Return the canonical id of the connected bond subset `mask`, minting a
    /// new id if its isomorphism class has not been seen before.
    ///
    /// Repeated calls with the same mask return the same id and do not record
    /// a second occurrence.
    pub fn canonical_id(&mut self, mask: &BitSet) -> usize {
        if let Some(&(id, _)) = self.masks.get(mask) {
            return id;
        }

        let (h, cyclic) = self.induced(mask);
        let id = if !cyclic && h.node_count() == h.edge_count() + 1 {
            let key = Key::Tree(tree_string(&h));
            match self.keys.get(&key) {
                Some(ids) => ids[0],
                None => {
                    let id = self.new_class(None);
                    self.keys.insert(key, vec![id]);
                    id
                }
            }
        } else {
            let key = Key::Cyclic {
                atoms: h.node_count(),
                bonds: h.edge_count(),
                hash: self.cyclic_hash(&h),
            };
            let found = self.keys.get(&key).and_then(|ids| {
                ids.iter().copied().find(|&id| {
                    self.classes[id]
                        .representative
                        .as_ref()
                        .is_some_and(|r| is_isomorphic_matching(r, &h, |a, b| a == b, |a, b| a == b))
                })
            });
            match found {
                Some(id) => id,
                None => {
                    let id = self.new_class(Some(h));
                    self.keys.entry(key).or_default().push(id);
                    id
                }
            }
        };

        let class = &mut self.classes[id];
        let occurrence = class.occurrences.len();
        class.occurrences.push(mask.clone());
        self.masks.insert(mask.clone(), (id, occurrence));
        id
    }

    /// Return the canonical id of `mask` if it has already been canonized.
    pub fn lookup(&self, mask: &BitSet) -> Option<usize> {
        self.masks.get(mask).map(|&(id, _)| id)
    }

    pub fn contains(&self, mask: &BitSet) -> bool {
        self.masks.contains_key(mask)
    }

    /// Return the position of `mask` among the occurrences of its class.
    pub fn occurrence_index(&self, mask: &BitSet) -> Option<usize> {
        self.masks.get(mask).map(|&(_, occurrence)| occurrence)
    }

    /// Return the `occurrence`-th mask canonized into class `id`.
    pub fn occurrence(&self, id: usize, occurrence: usize) -> Option<&BitSet> {
        self.classes.get(id)?.occurrences.get(occurrence)
    }

    /// Number of distinct masks canonized so far.
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Number of distinct isomorphism classes discovered so far.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    fn new_class(&mut self, representative: Option<LGraph>) -> usize {
        self.classes.push(Class {
            occurrences: Vec::new(),
            representative,
        });
        self.classes.len() - 1
    }

    /// Build the subgraph induced by `mask`, numbering vertices in the order
    /// bonds are scanned. Also report whether a cycle closed along the way.
    fn induced(&self, mask: &BitSet) -> (LGraph, bool) {
        let g = self.mol.graph();
        let mut h = LGraph::with_capacity(mask.len() + 1, mask.len());
        let mut local = HashMap::<NodeIndex<Index>, NodeIndex<Index>>::new();
        let mut components = UnionFind::<usize>::new(2 * mask.len());
        let mut cyclic = false;

        for e in mask {
            let eix = EdgeIndex::new(e);
            let Some((src, dst)) = g.edge_endpoints(eix) else {
                continue;
            };
            let a = *local
                .entry(src)
                .or_insert_with(|| h.add_node(g[src].element()));
            let b = *local
                .entry(dst)
                .or_insert_with(|| h.add_node(g[dst].element()));
            if !components.union(a.index(), b.index()) {
                cyclic = true;
            }
            h.add_edge(a, b, g[eix]);
        }
        (h, cyclic)
    }

    fn atom_weight(&mut self, element: Element) -> f64 {
        let next = ((self.atom_weights.len() + 1) * 5) as f64;
        *self.atom_weights.entry(element).or_insert(next)
    }

    /// Hash a graph by refining per-vertex values over neighbor sums, then
    /// combining the sorted, quantized values.
    fn cyclic_hash(&mut self, h: &LGraph) -> i32 {
        let n = h.node_count();
        let depth = n.min(HASH_DEPTH_MAX);

        let mut values = vec![0.0f64; n];
        for v in h.node_indices() {
            let mut value = self.atom_weight(h[v]) / DEPTH_FACTOR;
            for e in h.edges(v) {
                let w = other(&e, v);
                value += self.atom_weight(h[w]) + e.weight().order() as f64;
            }
            values[v.index()] = value;
        }

        for k in 1..depth {
            let old = values.clone();
            for v in h.node_indices() {
                for e in h.edges(v) {
                    let w = other(&e, v);
                    values[v.index()] +=
                        (old[w.index()] + e.weight().order() as f64) * k as f64 * DEPTH_FACTOR;
                }
            }
        }

        let mut hashes: Vec<f32> = values.into_iter().map(|x| x as f32).collect();
        hashes.sort_by(f32::total_cmp);
        hashes.into_iter().fold(17i32, |acc, x| {
            acc.wrapping_mul(31).wrapping_add((x * 1024.0) as i32)
        })
    }
}

fn other(e: &EdgeReference<'_, Bond, Index>, v: NodeIndex<Index>) -> NodeIndex<Index> {
    if e.source() == v {
        e.target()
    } else {
        e.source()
    }
}

/// Canonical string of a labeled tree, rooted at its centroid(s).
fn tree_string(h: &LGraph) -> String {
    let n = h.node_count();
    if n == 0 {
        return String::new();
    }

    // Subtree sizes with respect to an arbitrary root.
    let mut parent = vec![None; n];
    let mut seen = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut stack = vec![NodeIndex::<Index>::new(0)];
    seen[0] = true;
    while let Some(v) = stack.pop() {
        order.push(v);
        for w in h.neighbors(v) {
            if !seen[w.index()] {
                seen[w.index()] = true;
                parent[w.index()] = Some(v);
                stack.push(w);
            }
        }
    }
    let mut size = vec![1usize; n];
    for &v in order.iter().rev() {
        if let Some(p) = parent[v.index()] {
            size[p.index()] += size[v.index()];
        }
    }

    // Largest component left behind when `v` is deleted.
    let heaviest = |v: NodeIndex<Index>| {
        h.neighbors(v)
            .filter(|w| parent[w.index()] == Some(v))
            .map(|w| size[w.index()])
            .fold(n - size[v.index()], usize::max)
    };
    let lightest = order.iter().map(|&v| heaviest(v)).min().unwrap_or(0);
    let centroids: Vec<_> = order
        .iter()
        .copied()
        .filter(|&v| heaviest(v) == lightest)
        .collect();

    match centroids[..] {
        [c1, c2] => {
            let bond = h
                .find_edge(c1, c2)
                .map(|e| h[e].order())
                .unwrap_or_default();
            let mut halves = [encode(h, c1, Some(c2), "$"), encode(h, c2, Some(c1), "$")];
            halves.sort();
            format!("{bond}{}{}", halves[0], halves[1])
        }
        _ => encode(h, centroids[0], None, "$"),
    }
}

fn encode(h: &LGraph, v: NodeIndex<Index>, parent: Option<NodeIndex<Index>>, label: &str) -> String {
    let mut children: Vec<String> = h
        .edges(v)
        .filter_map(|e| {
            let w = other(&e, v);
            (Some(w) != parent).then(|| encode(h, w, Some(v), &e.weight().order().to_string()))
        })
        .collect();
    children.sort();
    format!("({label}{}{})", h[v], children.concat())
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    /// Exhaustive labeled isomorphism test for small bond subsets.
    fn brute_isomorphic(mol: &Molecule, a: &BitSet, b: &BitSet) -> bool {
        fn local(mol: &Molecule, mask: &BitSet) -> (Vec<Element>, HashMap<(usize, usize), Bond>) {
            let mut atoms = Vec::new();
            let mut ix = HashMap::new();
            let mut edges = HashMap::new();
            for e in mask {
                let (x, y, bond) = mol.bond(e).unwrap();
                let mut id = |v: usize| {
                    *ix.entry(v).or_insert_with(|| {
                        atoms.push(mol.element(v).unwrap());
                        atoms.len() - 1
                    })
                };
                let (lx, ly) = (id(x), id(y));
                edges.insert((lx.min(ly), lx.max(ly)), bond);
            }
            (atoms, edges)
        }

        fn search(
            perm: &mut Vec<usize>,
            used: &mut Vec<bool>,
            a: &(Vec<Element>, HashMap<(usize, usize), Bond>),
            b: &(Vec<Element>, HashMap<(usize, usize), Bond>),
        ) -> bool {
            let n = a.0.len();
            if perm.len() == n {
                return a.1.iter().all(|(&(x, y), bond)| {
                    let (px, py) = (perm[x], perm[y]);
                    b.1.get(&(px.min(py), px.max(py))) == Some(bond)
                });
            }
            let v = perm.len();
            for w in 0..n {
                if !used[w] && a.0[v] == b.0[w] {
                    used[w] = true;
                    perm.push(w);
                    if search(perm, used, a, b) {
                        return true;
                    }
                    perm.pop();
                    used[w] = false;
                }
            }
            false
        }

        let (la, lb) = (local(mol, a), local(mol, b));
        if la.0.len() != lb.0.len() || la.1.len() != lb.1.len() {
            return false;
        }
        let n = la.0.len();
        search(&mut Vec::new(), &mut vec![false; n], &la, &lb)
    }

    fn assert_matches_oracle(mol: &Molecule, masks: &[BitSet]) {
        let mut canonizer = Canonizer::new(mol);
        let ids: Vec<_> = masks.iter().map(|m| canonizer.canonical_id(m)).collect();
        for i in 0..masks.len() {
            for j in (i + 1)..masks.len() {
                assert_eq!(
                    ids[i] == ids[j],
                    brute_isomorphic(mol, &masks[i], &masks[j]),
                    "masks {:?} and {:?}",
                    masks[i],
                    masks[j]
                );
            }
        }
    }

    /// Add a ring over `elements` with the given bond orders, plus a carbon
    /// substituent on each ring position in `subs`.
    fn add_ring(mol: &mut Molecule, elements: &[Element], bonds: &[Bond], subs: &[usize]) -> BitSet {
        let atoms: Vec<_> = elements.iter().map(|&e| mol.add_atom(e)).collect();
        let mut mask = BitSet::new();
        for i in 0..atoms.len() {
            let j = (i + 1) % atoms.len();
            mask.insert(mol.add_bond(atoms[i], atoms[j], bonds[i]));
        }
        for &s in subs {
            let c = mol.add_atom(Element::Carbon);
            mask.insert(mol.add_bond(atoms[s], c, Bond::Single));
        }
        mask
    }

    #[test]
    fn random_trees_match_brute_force() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let elements = [Element::Carbon, Element::Nitrogen];
        let bonds = [Bond::Single, Bond::Double];

        let mut mol = Molecule::new();
        let mut masks = Vec::new();
        for _ in 0..80 {
            let edges = rng.gen_range(1..=4);
            let mut atoms = vec![mol.add_atom(elements[rng.gen_range(0..2)])];
            let mut mask = BitSet::new();
            for _ in 0..edges {
                let parent = atoms[rng.gen_range(0..atoms.len())];
                let child = mol.add_atom(elements[rng.gen_range(0..2)]);
                mask.insert(mol.add_bond(parent, child, bonds[rng.gen_range(0..2)]));
                atoms.push(child);
            }
            masks.push(mask);
        }

        assert_matches_oracle(&mol, &masks);
    }

    #[test]
    fn two_centroid_paths() {
        // C-C-N-C in two different bond orders, and its reversal.
        let mut mol = Molecule::new();
        let chain = |mol: &mut Molecule, elements: &[Element]| {
            let atoms: Vec<_> = elements.iter().map(|&e| mol.add_atom(e)).collect();
            BitSet::from_iter(
                atoms
                    .windows(2)
                    .map(|w| mol.add_bond(w[0], w[1], Bond::Single)),
            )
        };
        use Element::{Carbon as C, Nitrogen as N};
        let a = chain(&mut mol, &[C, C, N, C]);
        let b = chain(&mut mol, &[C, N, C, C]);
        let c = chain(&mut mol, &[C, N, N, C]);
        let d = chain(&mut mol, &[N, C, C, C]);

        let mut canonizer = Canonizer::new(&mol);
        assert_eq!(canonizer.canonical_id(&a), canonizer.canonical_id(&b));
        assert_ne!(canonizer.canonical_id(&a), canonizer.canonical_id(&c));
        assert_ne!(canonizer.canonical_id(&a), canonizer.canonical_id(&d));
        assert_matches_oracle(&mol, &[a, b, c, d]);
    }

    #[test]
    fn near_isomorphic_rings() {
        use Bond::{Double as D, Single as S};
        use Element::{Carbon as C, Nitrogen as N};
        let mut mol = Molecule::new();
        let six = [C; 6];
        let masks = vec![
            // Dimethylcyclohexanes: 1,2 / 1,3 / 1,4, and 1,2 again from a
            // different starting atom.
            add_ring(&mut mol, &six, &[S; 6], &[0, 1]),
            add_ring(&mut mol, &six, &[S; 6], &[0, 2]),
            add_ring(&mut mol, &six, &[S; 6], &[0, 3]),
            add_ring(&mut mol, &six, &[S; 6], &[4, 5]),
            // Kekulized benzene in both phases.
            add_ring(&mut mol, &six, &[S, D, S, D, S, D], &[]),
            add_ring(&mut mol, &six, &[D, S, D, S, D, S], &[]),
            // Toluene with the methyl next to a double or a single bond.
            add_ring(&mut mol, &six, &[S, D, S, D, S, D], &[0]),
            add_ring(&mut mol, &six, &[S, D, S, D, S, D], &[1]),
            // Pyridine-like rings with the nitrogen in different places.
            add_ring(&mut mol, &[N, C, C, C, C, C], &[S, D, S, D, S, D], &[]),
            add_ring(&mut mol, &[C, N, C, C, C, C], &[S, D, S, D, S, D], &[]),
            add_ring(&mut mol, &[C, C, C, N, C, C], &[S, D, S, D, S, D], &[]),
        ];
        assert_matches_oracle(&mol, &masks);

        let mut canonizer = Canonizer::new(&mol);
        let ids: Vec<_> = masks.iter().map(|m| canonizer.canonical_id(m)).collect();
        assert_eq!(ids[0], ids[3]);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_eq!(ids[4], ids[5]);
        assert_eq!(ids[6], ids[7]);
    }

    #[test]
    fn repeated_calls_are_idempotent() {
        let mut mol = Molecule::new();
        let ring = add_ring(&mut mol, &[Element::Carbon; 5], &[Bond::Single; 5], &[]);
        let chain = BitSet::from_iter([0, 1]);

        let mut canonizer = Canonizer::new(&mol);
        let first = canonizer.canonical_id(&ring);
        assert_eq!(first, 0);
        assert_eq!(canonizer.canonical_id(&chain), 1);
        assert_eq!(canonizer.canonical_id(&ring), first);
        assert_eq!(canonizer.canonical_id(&ring), first);

        assert_eq!(canonizer.len(), 2);
        assert_eq!(canonizer.class_count(), 2);
        assert_eq!(canonizer.occurrence_index(&ring), Some(0));
        assert_eq!(canonizer.occurrence(first, 0), Some(&ring));
        assert_eq!(canonizer.occurrence(first, 1), None);

        // A second, isomorphic chain is a new occurrence of the same class.
        let other_chain = BitSet::from_iter([2, 3]);
        assert_eq!(canonizer.canonical_id(&other_chain), 1);
        assert_eq!(canonizer.occurrence_index(&other_chain), Some(1));
        assert_eq!(canonizer.lookup(&BitSet::from_iter([3, 4])), None);
    }
}
