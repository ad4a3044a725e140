use crate::classifier::AtomTypeKey;
use crate::periodic::Element;
use std::fmt;

/// A single atom of a molecule.
///
/// Everything except the atom type is fixed at construction. The atom type is assigned by a
/// classification pass over the owning [`MoleculeSet`](super::MoleculeSet) and must be refreshed
/// whenever the active classifier or parameter store changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    element: &'static Element,
    index: usize,
    position: [f64; 3],
    formal_charge: i32,
    atom_type: Option<AtomTypeKey>,
}

impl Atom {
    /// Creates an untyped atom. The index is assigned when the atom is placed in a molecule.
    pub fn new(element: &'static Element, position: [f64; 3], formal_charge: i32) -> Self {
        Self {
            element,
            index: 0,
            position,
            formal_charge,
            atom_type: None,
        }
    }

    #[inline]
    pub fn element(&self) -> &'static Element {
        self.element
    }

    #[inline]
    pub fn symbol(&self) -> &'static str {
        self.element.symbol
    }

    /// Zero-based position of the atom within its molecule.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    #[inline]
    pub fn formal_charge(&self) -> i32 {
        self.formal_charge
    }

    /// The atom type assigned by the most recent classification pass, if any.
    #[inline]
    pub fn atom_type(&self) -> Option<&AtomTypeKey> {
        self.atom_type.as_ref()
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn set_atom_type(&mut self, key: AtomTypeKey) {
        self.atom_type = Some(key);
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Atom({}, idx={}, chg={})",
            self.element.symbol, self.index, self.formal_charge
        )
    }
}
