//! Labeled bond graphs of molecules.
//!
//! A [`Molecule`] is a simple undirected graph whose nodes are [`Atom`]s and
//! whose edges are [`Bond`]s. The order in which bonds are added fixes their
//! edge indices, and every bond subset used by the assembly search is a
//! [`BitSet`] over those indices.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    str::FromStr,
};

use bit_set::BitSet;
use petgraph::{
    algo::connected_components,
    graph::{EdgeIndex, Graph, NodeIndex},
    Undirected,
};

pub(crate) type Index = u32;
pub(crate) type MGraph = Graph<Atom, Bond, Undirected, Index>;

/// Largest number of bonds a molecule may carry into the assembly search.
pub const MAX_BONDS: usize = 512;

/// Thrown by [`Element::from_str`] if the string does not represent a valid
/// chemical element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseElementError;

macro_rules! periodic_table {
    ( $(($element:ident, $name:literal),)* ) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        /// Represents a chemical element.
        pub enum Element {
            $( $element, )*
        }

        impl Display for Element {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match &self {
                    $( Element::$element => write!(f, "{}", $name), )*
                }
            }
        }

        impl FromStr for Element {
            type Err = ParseElementError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $name => Ok(Element::$element), )*
                    _ => Err(ParseElementError),
                }
            }
        }
    };
}

periodic_table!(
    (Hydrogen, "H"),
    (Helium, "He"),
    (Lithium, "Li"),
    (Beryllium, "Be"),
    (Boron, "B"),
    (Carbon, "C"),
    (Nitrogen, "N"),
    (Oxygen, "O"),
    (Fluorine, "F"),
    (Neon, "Ne"),
    (Sodium, "Na"),
    (Magnesium, "Mg"),
    (Aluminum, "Al"),
    (Silicon, "Si"),
    (Phosphorus, "P"),
    (Sulfur, "S"),
    (Chlorine, "Cl"),
    (Argon, "Ar"),
    (Potassium, "K"),
    (Calcium, "Ca"),
    (Scandium, "Sc"),
    (Titanium, "Ti"),
    (Vanadium, "V"),
    (Chromium, "Cr"),
    (Manganese, "Mn"),
    (Iron, "Fe"),
    (Cobalt, "Co"),
    (Nickel, "Ni"),
    (Copper, "Cu"),
    (Zinc, "Zn"),
    (Gallium, "Ga"),
    (Germanium, "Ge"),
    (Arsenic, "As"),
    (Selenium, "Se"),
    (Bromine, "Br"),
    (Krypton, "Kr"),
    (Rubidium, "Rb"),
    (Strontium, "Sr"),
    (Yttrium, "Y"),
    (Zirconium, "Zr"),
    (Niobium, "Nb"),
    (Molybdenum, "Mo"),
    (Technetium, "Tc"),
    (Ruthenium, "Ru"),
    (Rhodium, "Rh"),
    (Palladium, "Pd"),
    (Silver, "Ag"),
    (Cadmium, "Cd"),
    (Indium, "In"),
    (Tin, "Sn"),
    (Antimony, "Sb"),
    (Tellurium, "Te"),
    (Iodine, "I"),
    (Xenon, "Xe"),
    (Cesium, "Cs"),
    (Barium, "Ba"),
    (Lanthanum, "La"),
    (Cerium, "Ce"),
    (Praseodymium, "Pr"),
    (Neodymium, "Nd"),
    (Promethium, "Pm"),
    (Samarium, "Sm"),
    (Europium, "Eu"),
    (Gadolinium, "Gd"),
    (Terbium, "Tb"),
    (Dysprosium, "Dy"),
    (Holmium, "Ho"),
    (Erbium, "Er"),
    (Thulium, "Tm"),
    (Ytterbium, "Yb"),
    (Lutetium, "Lu"),
    (Hafnium, "Hf"),
    (Tantalum, "Ta"),
    (Wolfram, "W"),
    (Rhenium, "Re"),
    (Osmium, "Os"),
    (Iridium, "Ir"),
    (Platinum, "Pt"),
    (Gold, "Au"),
    (Mercury, "Hg"),
    (Thallium, "Tl"),
    (Lead, "Pb"),
    (Bismuth, "Bi"),
    (Polonium, "Po"),
    (Astatine, "At"),
    (Radon, "Rn"),
    (Francium, "Fr"),
    (Radium, "Ra"),
    (Actinium, "Ac"),
    (Thorium, "Th"),
    (Protactinium, "Pa"),
    (Uranium, "U"),
    (Neptunium, "Np"),
    (Plutonium, "Pu"),
    (Americium, "Am"),
    (Curium, "Cm"),
    (Berkelium, "Bk"),
    (Californium, "Cf"),
    (Einsteinium, "Es"),
    (Fermium, "Fm"),
    (Mendelevium, "Md"),
    (Nobelium, "No"),
    (Lawrencium, "Lr"),
    (Rutherfordium, "Rf"),
    (Dubnium, "Db"),
    (Seaborgium, "Sg"),
    (Bohrium, "Bh"),
    (Hassium, "Hs"),
    (Meitnerium, "Mt"),
    (Darmstadtium, "Ds"),
    (Roentgenium, "Rg"),
    (Copernicium, "Cn"),
    (Nihonium, "Nh"),
    (Flerovium, "Fl"),
    (Moscovium, "Mc"),
    (Livermorium, "Lv"),
    (Tennessine, "Ts"),
    (Oganesson, "Og"),
);

/// The nodes of a [`Molecule`] graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    element: Element,
}

impl Atom {
    /// Construct an [`Atom`] of type `element`.
    pub fn new(element: Element) -> Self {
        Self { element }
    }

    /// Return this [`Atom`]'s element.
    pub fn element(&self) -> Element {
        self.element
    }
}

/// The edges of a [`Molecule`] graph.
///
/// Only single, double, and triple bonds take part in assembly. Aromatic
/// rings are expected in a kekulized form of alternating single and double
/// bonds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
}

impl Bond {
    /// Return the integer bond order (1, 2, or 3).
    pub fn order(&self) -> usize {
        match self {
            Bond::Single => 1,
            Bond::Double => 2,
            Bond::Triple => 3,
        }
    }
}

impl Display for Bond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Bond::Single => "single",
            Bond::Double => "double",
            Bond::Triple => "triple",
        };
        write!(f, "{name}")
    }
}

/// Thrown by [`Bond::try_from`] when given anything other than a 1, 2, or 3.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseBondError;

impl TryFrom<usize> for Bond {
    type Error = ParseBondError;
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Bond::Single),
            2 => Ok(Bond::Double),
            3 => Ok(Bond::Triple),
            _ => Err(ParseBondError),
        }
    }
}

/// Structural type of a bond: its order and the (sorted) elements it joins.
type BondType = (Element, Bond, Element);

/// A simple, loopless graph with [`Element`]s as nodes and [`Bond`]s as edges.
///
/// Atoms and bonds are indexed in insertion order. Unlike most chemistry
/// toolkits, hydrogen atoms are kept exactly as given; use
/// [`Molecule::without_hydrogens`] to drop them.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    graph: MGraph,
}

impl Molecule {
    /// Construct an empty [`Molecule`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a representation of this molecule as an `MGraph`.
    pub(crate) fn graph(&self) -> &MGraph {
        &self.graph
    }

    /// Add an atom of type `element` and return its index.
    pub fn add_atom(&mut self, element: Element) -> usize {
        self.graph.add_node(Atom::new(element)).index()
    }

    /// Add a bond between atoms `a` and `b` and return its index.
    ///
    /// # Panics
    ///
    /// Panics if either atom index is out of bounds.
    pub fn add_bond(&mut self, a: usize, b: usize, bond: Bond) -> usize {
        self.graph
            .add_edge(NodeIndex::new(a), NodeIndex::new(b), bond)
            .index()
    }

    /// Return the number of atoms.
    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of bonds.
    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Return the element of atom `ix`, if it exists.
    pub fn element(&self, ix: usize) -> Option<Element> {
        self.graph
            .node_weight(NodeIndex::new(ix))
            .map(|atom| atom.element())
    }

    /// Return the endpoints and type of bond `ix`, if it exists.
    pub fn bond(&self, ix: usize) -> Option<(usize, usize, Bond)> {
        let e = EdgeIndex::new(ix);
        let (a, b) = self.graph.edge_endpoints(e)?;
        let bond = *self.graph.edge_weight(e)?;
        Some((a.index(), b.index(), bond))
    }

    /// Return the set of all bond indices.
    pub fn all_bonds(&self) -> BitSet {
        BitSet::from_iter(0..self.graph.edge_count())
    }

    /// Return `true` iff this molecule contains self-loops or multiple edges
    /// between any pair of nodes.
    pub fn is_malformed(&self) -> bool {
        let mut uniq = HashSet::new();
        !self.graph.edge_indices().all(|ix| {
            self.graph.edge_endpoints(ix).is_some_and(|(src, dst)| {
                src != dst && uniq.insert((src.min(dst), src.max(dst)))
            })
        })
    }

    /// Return the number of connected components, counting isolated atoms.
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Return a copy of this molecule with all hydrogen atoms and their bonds
    /// removed. The relative order of the remaining atoms and bonds is kept.
    pub fn without_hydrogens(&self) -> Molecule {
        let graph = self.graph.filter_map(
            |_, atom| (atom.element() != Element::Hydrogen).then_some(*atom),
            |_, bond| Some(*bond),
        );
        Molecule { graph }
    }

    fn bond_type(&self, e: EdgeIndex<Index>) -> Option<BondType> {
        let (a, b) = self.graph.edge_endpoints(e)?;
        let ea = self.graph.node_weight(a)?.element();
        let eb = self.graph.node_weight(b)?.element();
        let bond = *self.graph.edge_weight(e)?;
        Some((ea.min(eb), bond, ea.max(eb)))
    }

    /// Return the indices of bonds whose structural type occurs exactly once
    /// in this molecule. Such bonds can never be part of a duplicate.
    pub fn unique_bonds(&self) -> Vec<usize> {
        let mut counts = HashMap::<BondType, usize>::new();
        for e in self.graph.edge_indices() {
            if let Some(t) = self.bond_type(e) {
                *counts.entry(t).or_default() += 1;
            }
        }
        self.graph
            .edge_indices()
            .filter(|&e| self.bond_type(e).is_some_and(|t| counts[&t] == 1))
            .map(|e| e.index())
            .collect()
    }

    /// Return a copy of this molecule that keeps every atom but drops the
    /// bonds in `removed`. Remaining bonds keep their relative order.
    pub fn without_bonds(&self, removed: &[usize]) -> Molecule {
        let removed: BitSet = BitSet::from_iter(removed.iter().copied());
        let graph = self.graph.filter_map(
            |_, atom| Some(*atom),
            |e, bond| (!removed.contains(e.index())).then_some(*bond),
        );
        Molecule { graph }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethanol_with_hydrogens() -> Molecule {
        let mut mol = Molecule::new();
        let c1 = mol.add_atom(Element::Carbon);
        let c2 = mol.add_atom(Element::Carbon);
        let o = mol.add_atom(Element::Oxygen);
        mol.add_bond(c1, c2, Bond::Single);
        mol.add_bond(c2, o, Bond::Single);
        for _ in 0..3 {
            let h = mol.add_atom(Element::Hydrogen);
            mol.add_bond(c1, h, Bond::Single);
        }
        let h = mol.add_atom(Element::Hydrogen);
        mol.add_bond(o, h, Bond::Single);
        mol
    }

    #[test]
    fn element_to_string() {
        assert!(Element::Hydrogen.to_string() == "H")
    }

    #[test]
    fn element_from_string() {
        assert!(str::parse("H") == Ok(Element::Hydrogen));
        assert!(str::parse::<Element>("Foo").is_err());
    }

    #[test]
    fn bond_orders() {
        assert_eq!(Bond::try_from(2), Ok(Bond::Double));
        assert!(Bond::try_from(4).is_err());
        assert_eq!(Bond::Triple.order(), 3);
        assert_eq!(Bond::Single.to_string(), "single");
    }

    #[test]
    fn strip_hydrogens() {
        let mol = ethanol_with_hydrogens();
        assert_eq!(mol.bond_count(), 6);

        let heavy = mol.without_hydrogens();
        assert_eq!(heavy.atom_count(), 3);
        assert_eq!(heavy.bond_count(), 2);
        assert_eq!(heavy.bond(1), Some((1, 2, Bond::Single)));
    }

    #[test]
    fn malformed_graphs() {
        let mut mol = Molecule::new();
        let a = mol.add_atom(Element::Carbon);
        let b = mol.add_atom(Element::Carbon);
        mol.add_bond(a, b, Bond::Single);
        assert!(!mol.is_malformed());

        let mut doubled = mol.clone();
        doubled.add_bond(b, a, Bond::Double);
        assert!(doubled.is_malformed());

        let mut looped = mol.clone();
        looped.add_bond(a, a, Bond::Single);
        assert!(looped.is_malformed());
    }

    #[test]
    fn unique_bond_types() {
        // C-C-N-O: every bond type appears once.
        let mut mol = Molecule::new();
        let ix: Vec<_> = [Element::Carbon, Element::Carbon, Element::Nitrogen, Element::Oxygen]
            .into_iter()
            .map(|e| mol.add_atom(e))
            .collect();
        for w in ix.windows(2) {
            mol.add_bond(w[0], w[1], Bond::Single);
        }
        assert_eq!(mol.unique_bonds(), vec![0, 1, 2]);

        // C-C-C-O: the C-C type repeats, the C-O type does not.
        let mut mol = Molecule::new();
        let ix: Vec<_> = [Element::Carbon, Element::Carbon, Element::Carbon, Element::Oxygen]
            .into_iter()
            .map(|e| mol.add_atom(e))
            .collect();
        for w in ix.windows(2) {
            mol.add_bond(w[0], w[1], Bond::Single);
        }
        assert_eq!(mol.unique_bonds(), vec![2]);

        let trimmed = mol.without_bonds(&[2]);
        assert_eq!(trimmed.atom_count(), 4);
        assert_eq!(trimmed.bond_count(), 2);
        assert_eq!(trimmed.component_count(), 2);
    }
}
