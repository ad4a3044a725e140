use super::atom::Atom;
use crate::error::ChargeError;
use std::fmt;

/// A bond between two atoms, identified by their zero-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub first: usize,
    pub second: usize,
    pub order: u8,
}

impl Bond {
    pub fn new(first: usize, second: usize, order: u8) -> Self {
        Self {
            first,
            second,
            order,
        }
    }
}

/// A molecule with its molecule-invariant geometry and connectivity precomputed.
///
/// The distance matrix and the bond-order matrix are both symmetric and stored row-major as
/// flat `n * n` vectors. They are computed once here so that repeated charge evaluations during
/// parameterization never recompute geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    name: String,
    atoms: Vec<Atom>,
    distances: Vec<f64>,
    bond_orders: Vec<u8>,
    highest_bond_orders: Vec<u8>,
    formal_charge: i32,
}

impl Molecule {
    /// Builds a molecule, reindexing the atoms in the given order.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::InvalidBond` if a bond references an atom index outside `atoms`
    /// or bonds an atom to itself.
    pub fn new(
        name: impl Into<String>,
        mut atoms: Vec<Atom>,
        bonds: &[Bond],
    ) -> Result<Self, ChargeError> {
        let name = name.into();
        let n = atoms.len();

        for (i, atom) in atoms.iter_mut().enumerate() {
            atom.set_index(i);
        }

        let mut bond_orders = vec![0u8; n * n];
        let mut highest_bond_orders = vec![0u8; n];
        for bond in bonds {
            if bond.first >= n || bond.second >= n || bond.first == bond.second {
                return Err(ChargeError::InvalidBond {
                    molecule: name,
                    first: bond.first,
                    second: bond.second,
                });
            }
            bond_orders[bond.first * n + bond.second] = bond.order;
            bond_orders[bond.second * n + bond.first] = bond.order;
            highest_bond_orders[bond.first] = highest_bond_orders[bond.first].max(bond.order);
            highest_bond_orders[bond.second] = highest_bond_orders[bond.second].max(bond.order);
        }

        let mut distances = vec![0.0; n * n];
        for i in 0..n {
            let pos_i = atoms[i].position();
            for j in (i + 1)..n {
                let pos_j = atoms[j].position();
                let dist_sq: f64 = pos_i
                    .iter()
                    .zip(pos_j.iter())
                    .map(|(pi, pj)| (pi - pj).powi(2))
                    .sum();
                let dist = dist_sq.sqrt();
                distances[i * n + j] = dist;
                distances[j * n + i] = dist;
            }
        }

        let formal_charge = atoms.iter().map(Atom::formal_charge).sum();

        Ok(Self {
            name,
            atoms,
            distances,
            bond_orders,
            highest_bond_orders,
            formal_charge,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Euclidean distance between atoms `i` and `j` in the structure's native length unit.
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances[i * self.atoms.len() + j]
    }

    /// Bond order between atoms `i` and `j`; zero when they are not bonded.
    #[inline]
    pub fn bond_order(&self, i: usize, j: usize) -> u8 {
        self.bond_orders[i * self.atoms.len() + j]
    }

    /// Maximum order of the bonds incident to atom `i`; zero for an unbonded atom.
    #[inline]
    pub fn highest_bond_order(&self, i: usize) -> u8 {
        self.highest_bond_orders[i]
    }

    /// Indices of the atoms bonded to atom `i`.
    pub fn bonded_atoms(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        let n = self.atoms.len();
        self.bond_orders[i * n..(i + 1) * n]
            .iter()
            .enumerate()
            .filter(|(_, order)| **order > 0)
            .map(|(j, _)| j)
    }

    /// Sum of the atoms' formal charges.
    #[inline]
    pub fn formal_charge(&self) -> i32 {
        self.formal_charge
    }

    pub(crate) fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }
}

impl fmt::Display for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Molecule({}, natoms={})", self.name, self.atoms.len())
    }
}
