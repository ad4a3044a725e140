//! Molecular data model: atoms, bonds, molecules and named molecule sets.
//!
//! Structures are produced by an external reader (the command-line front end ships an SDF
//! reader) and are immutable afterwards, except for the atom types assigned by classification.

mod atom;
mod molecule;
mod set;

pub use atom::Atom;
pub use molecule::{Bond, Molecule};
pub use set::{MoleculeSet, TypeCount};
