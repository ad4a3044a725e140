//! Partial charges of a molecule set, keyed by molecule name.
//!
//! The file format is a JSON object mapping each molecule name to an array with one number per
//! atom, in atom index order. Charges of molecules whose linear system could not be solved are
//! NaN; they are written as `null` and read back as NaN.

use crate::error::ChargeError;
use crate::structures::MoleculeSet;
use std::collections::BTreeMap;
use std::path::Path;

/// Per-molecule charge vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Charges {
    data: BTreeMap<String, Vec<f64>>,
}

impl Charges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, charges: Vec<f64>) {
        self.data.insert(name.into(), charges);
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.data.get(name).map(Vec::as_slice)
    }

    /// The charges of `name`, checked against the molecule's atom count.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::MissingCharges` if there is no entry and
    /// `ChargeError::ChargeCountMismatch` if the vector has the wrong length.
    pub fn for_molecule(&self, name: &str, atom_count: usize) -> Result<&[f64], ChargeError> {
        let charges = self
            .get(name)
            .ok_or_else(|| ChargeError::MissingCharges(name.to_string()))?;
        if charges.len() != atom_count {
            return Err(ChargeError::ChargeCountMismatch {
                name: name.to_string(),
                expected: atom_count,
                actual: charges.len(),
            });
        }
        Ok(charges)
    }

    /// Checks that every molecule of `molecules` has a charge vector of the right length.
    pub fn validate_against(&self, molecules: &MoleculeSet) -> Result<(), ChargeError> {
        for molecule in molecules {
            self.for_molecule(molecule.name(), molecule.len())?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entries in molecule-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.data
            .iter()
            .map(|(name, charges)| (name.as_str(), charges.as_slice()))
    }

    /// Parses a charges file from JSON text.
    pub fn load_from_str(json: &str) -> Result<Self, ChargeError> {
        let raw: BTreeMap<String, Vec<Option<f64>>> = serde_json::from_str(json)?;
        let data = raw
            .into_iter()
            .map(|(name, values)| {
                let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                (name, values)
            })
            .collect();
        Ok(Self { data })
    }

    /// Reads a charges file.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::Io` if the file cannot be read and `ChargeError::Json` if its
    /// content is malformed.
    pub fn load_from_file(path: &Path) -> Result<Self, ChargeError> {
        let content = std::fs::read_to_string(path).map_err(|io_error| ChargeError::Io {
            path: path.to_path_buf(),
            source: io_error,
        })?;
        Self::load_from_str(&content)
    }

    /// Serializes to JSON text; non-finite charges become `null`.
    pub fn to_json_string(&self) -> Result<String, ChargeError> {
        let raw: BTreeMap<&str, Vec<Option<f64>>> = self
            .data
            .iter()
            .map(|(name, values)| {
                let values = values
                    .iter()
                    .map(|&v| if v.is_finite() { Some(v) } else { None })
                    .collect();
                (name.as_str(), values)
            })
            .collect();
        Ok(serde_json::to_string(&raw)?)
    }

    /// Writes a charges file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ChargeError> {
        let json = self.to_json_string()?;
        std::fs::write(path, json).map_err(|io_error| ChargeError::Io {
            path: path.to_path_buf(),
            source: io_error,
        })
    }
}

impl FromIterator<(String, Vec<f64>)> for Charges {
    fn from_iter<I: IntoIterator<Item = (String, Vec<f64>)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}
