//! Atom-type classification schemes.
//!
//! A classifier maps an atom, in the context of its molecule, to a type tag. Together with the
//! element symbol and the scheme name the tag forms an [`AtomTypeKey`], the join key between the
//! atoms of a molecule set and the atom rows of a [`ParameterStore`].
//!
//! Fixed schemes implement [`Classifier`] and are looked up by name through a
//! [`ClassifierRegistry`]. The [`ParametrizedClassifier`] is not a fixed rule: it walks the rows of
//! a parameter store and evaluates, for every candidate row, the scheme that row was trained under.

use crate::error::ChargeError;
use crate::params::{AtomParameterRow, ParameterStore};
use crate::structures::{Atom, Molecule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Identity of an atom type: element symbol, classification scheme, and the tag the scheme
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomTypeKey {
    pub element: String,
    pub scheme: String,
    pub tag: String,
}

impl AtomTypeKey {
    pub fn new(
        element: impl Into<String>,
        scheme: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            element: element.into(),
            scheme: scheme.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for AtomTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.element, self.scheme, self.tag)
    }
}

/// A deterministic rule assigning a type tag to an atom from its molecular context.
///
/// Implementations must be pure functions of the molecule's connectivity: repeated calls on
/// the same atom return the same tag regardless of the order in which other atoms are visited.
pub trait Classifier: Send + Sync {
    /// The scheme name recorded in parameter files, e.g. `"hbo"`.
    fn name(&self) -> &str;

    /// The type tag of `atom` within `molecule`.
    fn get_type(&self, molecule: &Molecule, atom: &Atom) -> String;

    /// Whether `atom` carries `tag` under this scheme.
    fn check(&self, molecule: &Molecule, atom: &Atom, tag: &str) -> bool {
        self.get_type(molecule, atom) == tag
    }

    /// The full atom-type key of `atom` under this scheme.
    fn classify(&self, molecule: &Molecule, atom: &Atom) -> AtomTypeKey {
        AtomTypeKey::new(atom.symbol(), self.name(), self.get_type(molecule, atom))
    }
}

/// Every atom of an element shares one type, tagged `*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl Plain {
    pub const NAME: &'static str = "plain";
    pub const TAG: &'static str = "*";
}

impl Classifier for Plain {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn get_type(&self, _molecule: &Molecule, _atom: &Atom) -> String {
        Self::TAG.to_string()
    }
}

/// Atoms are tagged by the highest order among their bonds (`0` when unbonded).
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestBondOrder;

impl HighestBondOrder {
    pub const NAME: &'static str = "hbo";
}

impl Classifier for HighestBondOrder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn get_type(&self, molecule: &Molecule, atom: &Atom) -> String {
        molecule.highest_bond_order(atom.index()).to_string()
    }
}

/// Registration table of the available classification schemes, keyed by scheme name.
pub struct ClassifierRegistry {
    classifiers: HashMap<String, Box<dyn Classifier>>,
}

impl ClassifierRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            classifiers: HashMap::new(),
        }
    }

    /// A registry holding the built-in `plain` and `hbo` schemes.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Plain));
        registry.register(Box::new(HighestBondOrder));
        registry
    }

    /// Adds a scheme, replacing any previous scheme of the same name.
    pub fn register(&mut self, classifier: Box<dyn Classifier>) {
        self.classifiers
            .insert(classifier.name().to_string(), classifier);
    }

    /// Looks up a scheme by name.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::UnknownClassifier` if no scheme of that name is registered.
    pub fn get(&self, name: &str) -> Result<&dyn Classifier, ChargeError> {
        self.classifiers
            .get(name)
            .map(|classifier| classifier.as_ref())
            .ok_or_else(|| ChargeError::UnknownClassifier(name.to_string()))
    }

    /// Registered scheme names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classifiers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

static DEFAULT_REGISTRY: OnceLock<ClassifierRegistry> = OnceLock::new();

/// The process-wide registry of built-in schemes, built on first use.
pub fn default_registry() -> &'static ClassifierRegistry {
    DEFAULT_REGISTRY.get_or_init(ClassifierRegistry::with_defaults)
}

/// Dispatches classification to the schemes recorded in a parameter store's own rows.
///
/// Rows are tried in list order, so row order is match priority. A row matches an atom when the
/// element symbols agree and the row's scheme, evaluated on the atom, yields the row's tag.
/// Different rows of the same element may use different schemes.
pub struct ParametrizedClassifier<'a> {
    store: &'a ParameterStore,
    registry: &'a ClassifierRegistry,
}

impl<'a> ParametrizedClassifier<'a> {
    pub fn new(store: &'a ParameterStore, registry: &'a ClassifierRegistry) -> Self {
        Self { store, registry }
    }

    /// The first row of the store matching `atom`.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::NoMatchingParameters` naming the atom if no row matches, or
    /// `ChargeError::UnknownClassifier` if a candidate row references an unregistered scheme.
    pub fn matching_row(
        &self,
        molecule: &Molecule,
        atom: &Atom,
    ) -> Result<&'a AtomParameterRow, ChargeError> {
        for row in self.store.rows() {
            if row.key.element != atom.symbol() {
                continue;
            }
            let classifier = self.registry.get(&row.key.scheme)?;
            if classifier.check(molecule, atom, &row.key.tag) {
                return Ok(row);
            }
        }

        Err(ChargeError::NoMatchingParameters {
            element: atom.symbol().to_string(),
            index: atom.index(),
            molecule: molecule.name().to_string(),
        })
    }

    /// The atom-type key of the first matching row.
    pub fn classify(&self, molecule: &Molecule, atom: &Atom) -> Result<AtomTypeKey, ChargeError> {
        self.matching_row(molecule, atom).map(|row| row.key.clone())
    }
}
