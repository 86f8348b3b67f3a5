// Molecule definition, bond types, preprocessing
pub mod molecule;

// Data IO
pub mod loader;

// Canonical ids for bond subsets
pub mod canonize;

// Duplicate groups and the pairs they yield
pub mod matches;

// Cold and warm passes over the duplicate DAG
pub mod enumerate;

// Pruning bounds
pub mod bounds;

// Search states and fragmentation
pub mod state;

// Memoized search paths
pub mod memoize;

// Pathway reconstruction
pub mod pathway;

// Search options and cancellation
pub mod config;
pub mod interrupt;

// The hard bit: compute assembly index
pub mod assembly;

// Utility functions
pub mod utils;

// Python library
#[cfg(feature = "python")]
pub mod python;
