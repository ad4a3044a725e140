use super::molecule::Molecule;
use crate::classifier::{AtomTypeKey, Classifier, ClassifierRegistry, ParametrizedClassifier};
use crate::error::ChargeError;
use crate::params::ParameterStore;
use std::collections::{HashMap, HashSet};

/// Atom and molecule counts of one (element, tag) pair under a fixed scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCount {
    pub element: String,
    pub tag: String,
    pub atoms: usize,
    pub molecules: usize,
}

/// An ordered collection of uniquely named molecules.
#[derive(Debug, Clone, Default)]
pub struct MoleculeSet {
    molecules: Vec<Molecule>,
    by_name: HashMap<String, usize>,
}

impl MoleculeSet {
    /// Builds a set, preserving molecule order.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::DuplicateMolecule` if two molecules share a name.
    pub fn new(molecules: Vec<Molecule>) -> Result<Self, ChargeError> {
        let mut by_name = HashMap::with_capacity(molecules.len());
        for (i, molecule) in molecules.iter().enumerate() {
            if by_name.insert(molecule.name().to_string(), i).is_some() {
                return Err(ChargeError::DuplicateMolecule(molecule.name().to_string()));
            }
        }
        Ok(Self { molecules, by_name })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Molecule> {
        self.molecules.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Molecule> {
        self.by_name.get(name).map(|&i| &self.molecules[i])
    }

    /// Total number of atoms over all molecules.
    pub fn atom_count(&self) -> usize {
        self.molecules.iter().map(Molecule::len).sum()
    }

    /// Assigns every atom its type under a single fixed scheme.
    pub fn classify_atoms(&mut self, classifier: &dyn Classifier) {
        for molecule in &mut self.molecules {
            let shared: &Molecule = molecule;
            let keys: Vec<AtomTypeKey> = shared
                .atoms()
                .iter()
                .map(|atom| classifier.classify(shared, atom))
                .collect();
            for (atom, key) in molecule.atoms_mut().iter_mut().zip(keys) {
                atom.set_atom_type(key);
            }
        }
    }

    /// Assigns every atom the key of its first matching row in `store`.
    ///
    /// The pass stops at the first atom without a matching row; atoms of molecules visited before
    /// the failure keep their new types, later molecules keep their previous ones.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::NoMatchingParameters` naming the first unmatched atom, or
    /// `ChargeError::UnknownClassifier` if a row references an unregistered scheme.
    pub fn assign_atom_types(
        &mut self,
        store: &ParameterStore,
        registry: &ClassifierRegistry,
    ) -> Result<(), ChargeError> {
        let classifier = ParametrizedClassifier::new(store, registry);
        for molecule in &mut self.molecules {
            let shared: &Molecule = molecule;
            let keys = shared
                .atoms()
                .iter()
                .map(|atom| classifier.classify(shared, atom))
                .collect::<Result<Vec<_>, _>>()?;
            for (atom, key) in molecule.atoms_mut().iter_mut().zip(keys) {
                atom.set_atom_type(key);
            }
        }
        Ok(())
    }

    /// Distinct atom types of the set in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::UntypedAtom` if some atom has not been classified.
    pub fn atom_types(&self) -> Result<Vec<AtomTypeKey>, ChargeError> {
        Ok(self
            .atom_type_indices()?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// Distinct atom types in first-seen order, each with the `(molecule, atom)` index pairs of
    /// the atoms carrying it.
    pub fn atom_type_indices(&self) -> Result<Vec<(AtomTypeKey, Vec<(usize, usize)>)>, ChargeError> {
        let mut order: Vec<(AtomTypeKey, Vec<(usize, usize)>)> = Vec::new();
        let mut position: HashMap<AtomTypeKey, usize> = HashMap::new();

        for (m, molecule) in self.molecules.iter().enumerate() {
            for atom in molecule.atoms() {
                let key = atom.atom_type().ok_or_else(|| ChargeError::UntypedAtom {
                    element: atom.symbol().to_string(),
                    index: atom.index(),
                    molecule: molecule.name().to_string(),
                })?;
                let slot = *position.entry(key.clone()).or_insert_with(|| {
                    order.push((key.clone(), Vec::new()));
                    order.len() - 1
                });
                order[slot].1.push((m, atom.index()));
            }
        }

        Ok(order)
    }

    /// Per (element, tag) counts under `classifier`, sorted by atomic number then tag.
    pub fn type_summary(&self, classifier: &dyn Classifier) -> Vec<TypeCount> {
        let mut counts: HashMap<(u8, String, String), (usize, usize)> = HashMap::new();

        for molecule in &self.molecules {
            let mut seen = HashSet::new();
            for atom in molecule.atoms() {
                let id = (
                    atom.element().number,
                    atom.symbol().to_string(),
                    classifier.get_type(molecule, atom),
                );
                let entry = counts.entry(id.clone()).or_insert((0, 0));
                entry.0 += 1;
                if seen.insert(id) {
                    entry.1 += 1;
                }
            }
        }

        let mut summary: Vec<((u8, String, String), (usize, usize))> =
            counts.into_iter().collect();
        summary.sort_by(|(a, _), (b, _)| (a.0, &a.2).cmp(&(b.0, &b.2)));
        summary
            .into_iter()
            .map(|((_, element, tag), (atoms, molecules))| TypeCount {
                element,
                tag,
                atoms,
                molecules,
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a MoleculeSet {
    type Item = &'a Molecule;
    type IntoIter = std::slice::Iter<'a, Molecule>;

    fn into_iter(self) -> Self::IntoIter {
        self.molecules.iter()
    }
}
