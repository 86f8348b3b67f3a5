//! Parse molecules from MDL `.mol` (V2000) text.
//!
//! Only the counts line, atom block, and bond block are read; everything after
//! the bond block (properties, `M  END`, SD data) is ignored. Atoms, including
//! hydrogens, are added in file order so that bond indices follow the bond
//! block.

use std::path::Path;

use thiserror::Error;

use crate::molecule::{Bond, Element, Molecule};

/// Errors raised while reading a `.mol` file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("input is empty")]
    Empty,
    #[error("line {0}: malformed counts line")]
    BadCounts(usize),
    #[error("line {0}: malformed atom line")]
    BadAtomLine(usize),
    #[error("line {line}: unknown element `{symbol}`")]
    BadElement { line: usize, symbol: String },
    #[error("line {0}: malformed bond line")]
    BadBondLine(usize),
    #[error("line {line}: unsupported bond type {order}")]
    BadBondType { line: usize, order: usize },
    #[error("line {line}: bond refers to atom {atom}, but only {atoms} atoms are defined")]
    BadAtomReference {
        line: usize,
        atom: usize,
        atoms: usize,
    },
    #[error("input ends after {0} lines, before the bond block is complete")]
    Truncated(usize),
    #[error("could not read {0}")]
    Io(String),
}

/// Read and parse the first molecule of the `.mol` file at `path`.
pub fn parse_molfile(path: &Path) -> Result<Molecule, ParserError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ParserError::Io(format!("{path:?}: {e}")))?;
    parse_molfile_str(&contents)
}

/// Parse the first molecule in `input`, a `.mol` or `.sdf` document.
pub fn parse_molfile_str(input: &str) -> Result<Molecule, ParserError> {
    let lines: Vec<&str> = input.lines().collect();
    if lines.iter().all(|l| l.trim().is_empty()) {
        return Err(ParserError::Empty);
    }

    // Three header lines precede the counts line.
    let counts = *lines.get(3).ok_or(ParserError::Truncated(lines.len()))?;
    let (num_atoms, num_bonds) = parse_counts_line(counts).ok_or(ParserError::BadCounts(4))?;

    let atom_start = 4;
    let bond_start = atom_start + num_atoms;
    let bond_end = bond_start + num_bonds;
    if lines.len() < bond_end {
        return Err(ParserError::Truncated(lines.len()));
    }

    let mut mol = Molecule::new();
    for (offset, line) in lines[atom_start..bond_start].iter().enumerate() {
        let line_no = atom_start + offset + 1;
        let element = parse_atom_line(line, line_no)?;
        mol.add_atom(element);
    }

    for (offset, line) in lines[bond_start..bond_end].iter().enumerate() {
        let line_no = bond_start + offset + 1;
        let (a, b, order) = parse_bond_line(line).ok_or(ParserError::BadBondLine(line_no))?;
        for atom in [a, b] {
            if atom == 0 || atom > num_atoms {
                return Err(ParserError::BadAtomReference {
                    line: line_no,
                    atom,
                    atoms: num_atoms,
                });
            }
        }
        let bond = Bond::try_from(order)
            .map_err(|_| ParserError::BadBondType { line: line_no, order })?;
        mol.add_bond(a - 1, b - 1, bond);
    }

    Ok(mol)
}

/// Read a fixed-width integer field, tolerating short lines.
fn field(line: &str, start: usize, end: usize) -> Option<usize> {
    let raw = line.get(start..end.min(line.len()))?;
    raw.trim().parse().ok()
}

fn parse_counts_line(line: &str) -> Option<(usize, usize)> {
    Some((field(line, 0, 3)?, field(line, 3, 6)?))
}

fn parse_atom_line(line: &str, line_no: usize) -> Result<Element, ParserError> {
    // The symbol occupies columns 32-34; fall back to the fourth token for
    // files that do not respect the fixed-width layout.
    let symbol = line
        .get(31..34.min(line.len()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| line.split_whitespace().nth(3))
        .ok_or(ParserError::BadAtomLine(line_no))?;
    symbol.parse().map_err(|_| ParserError::BadElement {
        line: line_no,
        symbol: symbol.to_string(),
    })
}

fn parse_bond_line(line: &str) -> Option<(usize, usize, usize)> {
    Some((field(line, 0, 3)?, field(line, 3, 6)?, field(line, 6, 9)?))
}
