//! This module provides the parameter store shared by charge methods and the parameterization
//! engine.
//!
//! A [`ParameterStore`] holds a fixed, method-declared set of common coefficients and an ordered
//! list of atom rows, each keyed by an [`AtomTypeKey`] and carrying one value per declared atom
//! parameter name. The store can be flattened into a single numeric vector and rebuilt from one;
//! that vector is the coordinate system the optimizer searches, so the flattening order is
//! fixed by [`PackLayout`]: common values in declared order, then atom rows in list order, each
//! row's values in declared order.

use crate::classifier::AtomTypeKey;
use crate::error::ChargeError;
use crate::structures::MoleculeSet;
use rand::Rng;
use serde::de;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Coefficients of one atom type.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomParameterRow {
    /// The atom type this row applies to.
    pub key: AtomTypeKey,
    /// One value per atom parameter name, in the store's declared order.
    pub values: Vec<f64>,
}

/// Offsets of the packed parameter vector.
///
/// Common values occupy `[0, atom_offset)`; atom row `r` occupies
/// `[atom_offset + r * atom_row_stride, atom_offset + (r + 1) * atom_row_stride)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackLayout {
    pub atom_offset: usize,
    pub atom_row_stride: usize,
    pub row_count: usize,
}

impl PackLayout {
    /// Total length of the packed vector.
    #[inline]
    pub fn size(&self) -> usize {
        self.atom_offset + self.atom_row_stride * self.row_count
    }

    /// Packed index of parameter `parameter` of atom row `row`.
    #[inline]
    pub fn atom_index(&self, row: usize, parameter: usize) -> usize {
        self.atom_offset + row * self.atom_row_stride + parameter
    }
}

/// Inclusive bounds `[low, high]` for one parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct ParameterRange {
    pub low: f64,
    pub high: f64,
}

impl ParameterRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.low, self.high)
    }

    fn validate(&self, name: &str) -> Result<(), ChargeError> {
        // Uniform sampling needs a finite width as well as finite ends.
        if (self.high - self.low).is_finite() && self.low <= self.high {
            Ok(())
        } else {
            Err(ChargeError::InvalidRange {
                name: name.to_string(),
                low: self.low,
                high: self.high,
            })
        }
    }
}

impl From<(f64, f64)> for ParameterRange {
    fn from((low, high): (f64, f64)) -> Self {
        Self { low, high }
    }
}

impl From<ParameterRange> for (f64, f64) {
    fn from(range: ParameterRange) -> Self {
        (range.low, range.high)
    }
}

/// Common coefficients plus atom-type-keyed coefficient rows of one charge method.
///
/// The store owns all of its data; `clone()` yields a fully independent copy that can be mutated
/// through [`load_packed`](Self::load_packed) without affecting the original.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    common_names: Vec<String>,
    common_values: Vec<f64>,
    atom_names: Vec<String>,
    rows: Vec<AtomParameterRow>,
    row_index: HashMap<AtomTypeKey, usize>,
    common_ranges: Option<Vec<ParameterRange>>,
    atom_ranges: Option<Vec<ParameterRange>>,
}

/// On-disk JSON shape: `{"common": {name: value}, "atom": [[element, scheme, tag, v1, ...]]}`.
#[derive(Deserialize, Serialize)]
struct ParameterFile {
    common: BTreeMap<String, f64>,
    atom: Vec<Vec<Value>>,
}

impl ParameterStore {
    /// Creates an empty store for the given parameter names. Common values start at zero.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::DuplicateParameterName` if a name is declared twice, in either list.
    pub fn new(common_names: &[&str], atom_names: &[&str]) -> Result<Self, ChargeError> {
        if let Some(name) = first_duplicate(common_names).or_else(|| first_duplicate(atom_names)) {
            return Err(ChargeError::DuplicateParameterName(name.to_string()));
        }
        Ok(Self::with_names(common_names, atom_names))
    }

    /// Creates an empty store for names a method declares as constants.
    pub(crate) fn with_names(common_names: &[&str], atom_names: &[&str]) -> Self {
        debug_assert!(first_duplicate(common_names).is_none());
        debug_assert!(first_duplicate(atom_names).is_none());

        Self {
            common_names: common_names.iter().map(|s| s.to_string()).collect(),
            common_values: vec![0.0; common_names.len()],
            atom_names: atom_names.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
            row_index: HashMap::new(),
            common_ranges: None,
            atom_ranges: None,
        }
    }

    /// Loads common values and atom rows from a JSON parameter file, replacing existing rows.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::Io` if the file cannot be read, and otherwise the errors of
    /// [`load_from_str`](Self::load_from_str).
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), ChargeError> {
        let content = std::fs::read_to_string(path).map_err(|io_error| ChargeError::Io {
            path: path.to_path_buf(),
            source: io_error,
        })?;

        self.load_from_str(&content)?;
        info!(
            path = %path.display(),
            rows = self.rows.len(),
            "Loaded parameters."
        );
        Ok(())
    }

    /// Parses common values and atom rows from JSON text, replacing existing rows.
    ///
    /// Tags may be written as strings or numbers; integral numbers such as `2` or `2.0` are
    /// stored as the integer text `"2"`. Nothing is modified unless the whole file is valid.
    ///
    /// # Errors
    ///
    /// * `ChargeError::Json` for malformed JSON or a row whose key fields are not scalars.
    /// * `ChargeError::UnknownCommonParameter` for a common name the method does not declare.
    /// * `ChargeError::DuplicateAtomRow` when two rows share an (element, scheme, tag) key.
    /// * `ChargeError::InvalidRowLength` when a row has the wrong number of values.
    pub fn load_from_str(&mut self, json: &str) -> Result<(), ChargeError> {
        let file: ParameterFile = serde_json::from_str(json)?;

        let mut common_values = self.common_values.clone();
        for (name, value) in &file.common {
            common_values[self.common_position(name)?] = *value;
        }

        let mut rows = Vec::with_capacity(file.atom.len());
        let mut row_index = HashMap::with_capacity(file.atom.len());
        for raw in &file.atom {
            let (key, values) = parse_row(raw, self.atom_names.len())?;
            if row_index.contains_key(&key) {
                return Err(ChargeError::DuplicateAtomRow(key.to_string()));
            }
            row_index.insert(key.clone(), rows.len());
            rows.push(AtomParameterRow { key, values });
        }

        self.common_values = common_values;
        self.rows = rows;
        self.row_index = row_index;
        Ok(())
    }

    /// Resets the store for a training set: every common value becomes zero and one zero-valued
    /// row is created per distinct atom type of `molecules`, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::UntypedAtom` if some atom of the set has not been classified.
    pub fn init_from_set(&mut self, molecules: &MoleculeSet) -> Result<(), ChargeError> {
        self.common_values.iter_mut().for_each(|value| *value = 0.0);
        self.clear_rows();

        for key in molecules.atom_types()? {
            let zeros = vec![0.0; self.atom_names.len()];
            self.add_row(key, zeros)?;
        }

        Ok(())
    }

    /// Appends an atom row.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::DuplicateAtomRow` if the key is already present and
    /// `ChargeError::InvalidRowLength` if `values` does not have one entry per atom parameter.
    pub fn add_row(&mut self, key: AtomTypeKey, values: Vec<f64>) -> Result<(), ChargeError> {
        if values.len() != self.atom_names.len() {
            return Err(ChargeError::InvalidRowLength {
                key: key.to_string(),
                expected: self.atom_names.len(),
                actual: values.len(),
            });
        }
        if self.row_index.contains_key(&key) {
            return Err(ChargeError::DuplicateAtomRow(key.to_string()));
        }

        self.row_index.insert(key.clone(), self.rows.len());
        self.rows.push(AtomParameterRow { key, values });
        Ok(())
    }

    fn clear_rows(&mut self) {
        self.rows.clear();
        self.row_index.clear();
    }

    /// Offsets of the packed representation.
    pub fn layout(&self) -> PackLayout {
        PackLayout {
            atom_offset: self.common_names.len(),
            atom_row_stride: self.atom_names.len(),
            row_count: self.rows.len(),
        }
    }

    /// Length of the packed representation.
    #[inline]
    pub fn size(&self) -> usize {
        self.layout().size()
    }

    /// Flattens all values in layout order.
    pub fn pack_values(&self) -> Vec<f64> {
        let mut packed = Vec::with_capacity(self.size());
        packed.extend_from_slice(&self.common_values);
        for row in &self.rows {
            packed.extend_from_slice(&row.values);
        }
        packed
    }

    /// Overwrites all values from a packed vector, keeping every row's key.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::PackedSizeMismatch` if `packed` does not have exactly
    /// [`size`](Self::size) entries; the store is left untouched in that case.
    pub fn load_packed(&mut self, packed: &[f64]) -> Result<(), ChargeError> {
        let layout = self.layout();
        if packed.len() != layout.size() {
            return Err(ChargeError::PackedSizeMismatch {
                expected: layout.size(),
                actual: packed.len(),
            });
        }

        self.common_values
            .copy_from_slice(&packed[..layout.atom_offset]);
        for (r, row) in self.rows.iter_mut().enumerate() {
            let start = layout.atom_index(r, 0);
            row.values
                .copy_from_slice(&packed[start..start + layout.atom_row_stride]);
        }
        Ok(())
    }

    /// Declares inclusive bounds for every common and atom parameter name.
    ///
    /// # Errors
    ///
    /// * `ChargeError::UnknownCommonParameter` / `ChargeError::UnknownAtomParameter` for a range
    ///   naming an undeclared parameter.
    /// * `ChargeError::MissingRange` if some declared parameter has no range.
    /// * `ChargeError::InvalidRange` for non-finite or inverted bounds.
    pub fn set_ranges(
        &mut self,
        common_ranges: &BTreeMap<String, ParameterRange>,
        atom_ranges: &BTreeMap<String, ParameterRange>,
    ) -> Result<(), ChargeError> {
        if let Some(name) = common_ranges
            .keys()
            .find(|name| !self.common_names.contains(name))
        {
            return Err(ChargeError::UnknownCommonParameter(name.clone()));
        }
        if let Some(name) = atom_ranges
            .keys()
            .find(|name| !self.atom_names.contains(name))
        {
            return Err(ChargeError::UnknownAtomParameter(name.clone()));
        }

        let common = ordered_ranges(&self.common_names, common_ranges)?;
        let atom = ordered_ranges(&self.atom_names, atom_ranges)?;

        self.common_ranges = Some(common);
        self.atom_ranges = Some(atom);
        Ok(())
    }

    /// Per-entry bounds of the packed vector, if ranges were declared.
    pub fn packed_bounds(&self) -> Option<Vec<ParameterRange>> {
        let common = self.common_ranges.as_ref()?;
        let atom = self.atom_ranges.as_ref()?;

        let mut bounds = Vec::with_capacity(self.size());
        bounds.extend_from_slice(common);
        for _ in &self.rows {
            bounds.extend_from_slice(atom);
        }
        Some(bounds)
    }

    /// Draws every value uniformly from its declared range, or from `[0, 1)` when no ranges
    /// were declared.
    pub fn set_random_values<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match (&self.common_ranges, &self.atom_ranges) {
            (Some(common), Some(atom)) => {
                for (value, range) in self.common_values.iter_mut().zip(common) {
                    *value = rng.gen_range(range.low..=range.high);
                }
                for row in &mut self.rows {
                    for (value, range) in row.values.iter_mut().zip(atom) {
                        *value = rng.gen_range(range.low..=range.high);
                    }
                }
            }
            _ => {
                for value in &mut self.common_values {
                    *value = rng.r#gen::<f64>();
                }
                for row in &mut self.rows {
                    for value in &mut row.values {
                        *value = rng.r#gen::<f64>();
                    }
                }
            }
        }
    }

    pub fn common_names(&self) -> &[String] {
        &self.common_names
    }

    pub fn atom_names(&self) -> &[String] {
        &self.atom_names
    }

    pub fn rows(&self) -> &[AtomParameterRow] {
        &self.rows
    }

    /// The row for an atom type, if present.
    pub fn row(&self, key: &AtomTypeKey) -> Option<&AtomParameterRow> {
        self.row_index.get(key).map(|&i| &self.rows[i])
    }

    fn common_position(&self, name: &str) -> Result<usize, ChargeError> {
        self.common_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ChargeError::UnknownCommonParameter(name.to_string()))
    }

    /// Value of a common parameter.
    pub fn common(&self, name: &str) -> Result<f64, ChargeError> {
        Ok(self.common_values[self.common_position(name)?])
    }

    /// Sets a common parameter.
    pub fn set_common(&mut self, name: &str, value: f64) -> Result<(), ChargeError> {
        let i = self.common_position(name)?;
        self.common_values[i] = value;
        Ok(())
    }

    /// Offset of an atom parameter name within each row's values.
    pub fn atom_parameter_index(&self, name: &str) -> Result<usize, ChargeError> {
        self.atom_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ChargeError::UnknownAtomParameter(name.to_string()))
    }

    /// Value of atom parameter `name` in the row of `key`.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::UnknownAtomParameter` for an undeclared name. A missing row yields
    /// `Ok(None)`.
    pub fn atom_value(&self, key: &AtomTypeKey, name: &str) -> Result<Option<f64>, ChargeError> {
        let index = self.atom_parameter_index(name)?;
        Ok(self.row(key).map(|row| row.values[index]))
    }

    /// Serializes the store in the parameter file format.
    pub fn to_json_string(&self) -> Result<String, ChargeError> {
        let common = self
            .common_names
            .iter()
            .cloned()
            .zip(self.common_values.iter().copied())
            .collect();
        let atom = self
            .rows
            .iter()
            .map(|row| {
                let mut raw = vec![
                    Value::from(row.key.element.clone()),
                    Value::from(row.key.scheme.clone()),
                    Value::from(row.key.tag.clone()),
                ];
                raw.extend(row.values.iter().map(|&v| Value::from(v)));
                raw
            })
            .collect();

        Ok(serde_json::to_string_pretty(&ParameterFile { common, atom })?)
    }

    /// Writes the store to `path` in the parameter file format.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ChargeError> {
        let json = self.to_json_string()?;
        std::fs::write(path, json).map_err(|io_error| ChargeError::Io {
            path: path.to_path_buf(),
            source: io_error,
        })
    }
}

impl Default for ParameterStore {
    /// A store with no declared parameters, for methods that have none.
    fn default() -> Self {
        Self {
            common_names: Vec::new(),
            common_values: Vec::new(),
            atom_names: Vec::new(),
            rows: Vec::new(),
            row_index: HashMap::new(),
            common_ranges: None,
            atom_ranges: None,
        }
    }
}

impl fmt::Display for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Common parameters:")?;
        for (name, value) in self.common_names.iter().zip(&self.common_values) {
            writeln!(f, "{}: {:.3}", name, value)?;
        }
        writeln!(f, "Atom parameters:")?;
        for row in &self.rows {
            let values: Vec<String> = self
                .atom_names
                .iter()
                .zip(&row.values)
                .map(|(name, value)| format!("{}={:.3}", name, value))
                .collect();
            writeln!(f, "{}: {}", row.key, values.join(", "))?;
        }
        Ok(())
    }
}

fn first_duplicate<'a>(names: &[&'a str]) -> Option<&'a str> {
    names
        .iter()
        .enumerate()
        .find(|&(i, name)| names[..i].contains(name))
        .map(|(_, name)| *name)
}

/// Text of a numeric tag. Integral floats collapse to their integer form.
fn numeric_tag(n: &Number) -> String {
    match n.as_f64() {
        Some(x) if n.is_f64() && x.fract() == 0.0 && x.abs() < 1e15 => (x as i64).to_string(),
        _ => n.to_string(),
    }
}

fn ordered_ranges(
    names: &[String],
    ranges: &BTreeMap<String, ParameterRange>,
) -> Result<Vec<ParameterRange>, ChargeError> {
    names
        .iter()
        .map(|name| {
            let range = ranges
                .get(name)
                .ok_or_else(|| ChargeError::MissingRange(name.clone()))?;
            range.validate(name)?;
            Ok(*range)
        })
        .collect()
}

fn parse_row(raw: &[Value], value_count: usize) -> Result<(AtomTypeKey, Vec<f64>), ChargeError> {
    let field = |i: usize| -> Result<String, ChargeError> {
        match raw.get(i) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(numeric_tag(n)),
            _ => Err(ChargeError::Json(de::Error::custom(format!(
                "atom row field {} must be a string or number",
                i
            )))),
        }
    };

    let key = AtomTypeKey::new(field(0)?, field(1)?, field(2)?);
    let values = raw
        .iter()
        .skip(3)
        .map(|value| {
            value.as_f64().ok_or_else(|| {
                ChargeError::Json(de::Error::custom(format!(
                    "non-numeric value in atom row {}",
                    key
                )))
            })
        })
        .collect::<Result<Vec<f64>, ChargeError>>()?;

    if values.len() != value_count {
        return Err(ChargeError::InvalidRowLength {
            key: key.to_string(),
            expected: value_count,
            actual: values.len(),
        });
    }

    Ok((key, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EEM_JSON: &str = r#"
    {
        "common": {"kappa": 0.25},
        "atom": [
            ["C", "hbo", "1", 2.48, 0.91],
            ["C", "hbo", 2, 2.52, 0.88],
            ["H", "plain", "*", 2.39, 0.96]
        ]
    }
    "#;

    fn eem_store() -> ParameterStore {
        let mut store = ParameterStore::new(&["kappa"], &["A", "B"]).unwrap();
        store.load_from_str(EEM_JSON).unwrap();
        store
    }

    #[test]
    fn atom_value_reads_one_coefficient() {
        let store = eem_store();
        let key = AtomTypeKey::new("C", "hbo", "2");
        assert_eq!(store.atom_value(&key, "B").unwrap(), Some(0.88));
        assert_eq!(
            store
                .atom_value(&AtomTypeKey::new("N", "hbo", "1"), "A")
                .unwrap(),
            None
        );
        assert!(matches!(
            store.atom_value(&key, "chi"),
            Err(ChargeError::UnknownAtomParameter(_))
        ));
    }

    #[test]
    fn new_rejects_duplicate_names() {
        assert!(matches!(
            ParameterStore::new(&["kappa", "kappa"], &["A"]),
            Err(ChargeError::DuplicateParameterName(name)) if name == "kappa"
        ));
        assert!(matches!(
            ParameterStore::new(&["kappa"], &["A", "B", "A"]),
            Err(ChargeError::DuplicateParameterName(_))
        ));
    }

    #[test]
    fn load_from_str_reads_common_and_rows_in_order() {
        let store = eem_store();
        assert_eq!(store.common("kappa").unwrap(), 0.25);
        assert_eq!(store.rows().len(), 3);
        assert_eq!(store.rows()[1].key, AtomTypeKey::new("C", "hbo", "2"));
        assert_eq!(store.rows()[2].values, vec![2.39, 0.96]);
        let key = AtomTypeKey::new("H", "plain", "*");
        assert_eq!(store.row(&key).unwrap().values[1], 0.96);
    }

    #[test]
    fn load_rejects_unknown_common_parameter() {
        let mut store = ParameterStore::new(&["kappa"], &["A", "B"]).unwrap();
        let result = store.load_from_str(r#"{"common": {"alpha": 1.0}, "atom": []}"#);
        assert!(matches!(
            result,
            Err(ChargeError::UnknownCommonParameter(name)) if name == "alpha"
        ));
    }

    #[test]
    fn load_rejects_duplicate_rows() {
        let mut store = ParameterStore::new(&["kappa"], &["A", "B"]).unwrap();
        let json = r#"{"common": {}, "atom": [["C", "plain", "*", 1, 2], ["C", "plain", "*", 3, 4]]}"#;
        assert!(matches!(
            store.load_from_str(json),
            Err(ChargeError::DuplicateAtomRow(_))
        ));
    }

    #[test]
    fn load_rejects_short_rows_and_bad_json() {
        let mut store = ParameterStore::new(&["kappa"], &["A", "B"]).unwrap();
        let json = r#"{"common": {}, "atom": [["C", "plain", "*", 1]]}"#;
        assert!(matches!(
            store.load_from_str(json),
            Err(ChargeError::InvalidRowLength {
                expected: 2,
                actual: 1,
                ..
            })
        ));
        assert!(matches!(
            store.load_from_str("not json"),
            Err(ChargeError::Json(_))
        ));
    }

    #[test]
    fn failed_load_leaves_store_unchanged() {
        let mut store = eem_store();
        let before = store.clone();

        let duplicate = r#"{"common": {"kappa": 9.0}, "atom": [["O", "plain", "*", 1, 2], ["O", "plain", "*", 3, 4]]}"#;
        assert!(matches!(
            store.load_from_str(duplicate),
            Err(ChargeError::DuplicateAtomRow(_))
        ));
        assert_eq!(store, before);

        let short = r#"{"common": {"kappa": 9.0}, "atom": [["O", "plain", "*", 1, 2], ["N", "plain", "*", 3]]}"#;
        assert!(matches!(
            store.load_from_str(short),
            Err(ChargeError::InvalidRowLength { .. })
        ));
        assert_eq!(store, before);

        let unknown = r#"{"common": {"kappa": 9.0, "alpha": 1.0}, "atom": []}"#;
        assert!(matches!(
            store.load_from_str(unknown),
            Err(ChargeError::UnknownCommonParameter(_))
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn integral_float_tags_are_stored_as_integers() {
        let mut store = ParameterStore::new(&["kappa"], &["A", "B"]).unwrap();
        store
            .load_from_str(r#"{"common": {}, "atom": [["C", "hbo", 2.0, 1, 2], ["N", "hbo", 1.5, 3, 4]]}"#)
            .unwrap();
        assert_eq!(store.rows()[0].key, AtomTypeKey::new("C", "hbo", "2"));
        assert!(store.row(&AtomTypeKey::new("C", "hbo", "2")).is_some());
        assert_eq!(store.rows()[1].key.tag, "1.5");
    }

    #[test]
    fn load_from_file_and_missing_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", EEM_JSON).unwrap();

        let mut store = ParameterStore::new(&["kappa"], &["A", "B"]).unwrap();
        store.load_from_file(temp_file.path()).unwrap();
        assert_eq!(store, eem_store());

        let result = store.load_from_file(Path::new("non_existent_parameters.json"));
        assert!(matches!(result, Err(ChargeError::Io { .. })));
    }

    #[test]
    fn pack_order_is_common_then_rows() {
        let store = eem_store();
        assert_eq!(store.size(), 1 + 3 * 2);
        assert_eq!(
            store.pack_values(),
            vec![0.25, 2.48, 0.91, 2.52, 0.88, 2.39, 0.96]
        );
        let layout = store.layout();
        assert_eq!(layout.atom_offset, 1);
        assert_eq!(layout.atom_row_stride, 2);
        assert_eq!(layout.row_count, 3);
        assert_eq!(layout.atom_index(2, 1), 6);
    }

    #[test]
    fn load_packed_of_pack_values_is_identity() {
        let original = eem_store();
        let mut store = original.clone();
        store.load_packed(&original.pack_values()).unwrap();
        assert_eq!(store, original);
    }

    #[test]
    fn load_packed_overwrites_values_and_keeps_keys() {
        let mut store = eem_store();
        let keys: Vec<AtomTypeKey> = store.rows().iter().map(|r| r.key.clone()).collect();
        store
            .load_packed(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0])
            .unwrap();
        assert_eq!(store.common("kappa").unwrap(), 1.0);
        assert_eq!(store.rows()[0].values, vec![2.0, 3.0]);
        assert_eq!(store.rows()[2].values, vec![6.0, 7.0]);
        let after: Vec<AtomTypeKey> = store.rows().iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys, after);
    }

    #[test]
    fn load_packed_rejects_wrong_length() {
        let mut store = eem_store();
        let before = store.clone();
        assert!(matches!(
            store.load_packed(&[1.0, 2.0]),
            Err(ChargeError::PackedSizeMismatch {
                expected: 7,
                actual: 2
            })
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn clone_is_independent() {
        let original = eem_store();
        let mut copy = original.clone();
        copy.load_packed(&[9.0; 7]).unwrap();
        assert_eq!(original.common("kappa").unwrap(), 0.25);
        assert_eq!(copy.common("kappa").unwrap(), 9.0);
    }

    #[test]
    fn random_values_respect_ranges() {
        let mut store = eem_store();
        let common = BTreeMap::from([("kappa".to_string(), ParameterRange::new(0.1, 0.2))]);
        let atom = BTreeMap::from([
            ("A".to_string(), ParameterRange::new(2.0, 3.0)),
            ("B".to_string(), ParameterRange::new(0.5, 0.5)),
        ]);
        store.set_ranges(&common, &atom).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            store.set_random_values(&mut rng);
            let kappa = store.common("kappa").unwrap();
            assert!((0.1..=0.2).contains(&kappa));
            for row in store.rows() {
                assert!((2.0..=3.0).contains(&row.values[0]));
                assert_eq!(row.values[1], 0.5);
            }
        }

        let bounds = store.packed_bounds().unwrap();
        assert_eq!(bounds.len(), store.size());
        assert_eq!(bounds[0], ParameterRange::new(0.1, 0.2));
        assert_eq!(bounds[6], ParameterRange::new(0.5, 0.5));
    }

    #[test]
    fn random_values_default_to_unit_interval() {
        let mut store = eem_store();
        let mut rng = StdRng::seed_from_u64(11);
        store.set_random_values(&mut rng);
        assert!(store.packed_bounds().is_none());
        assert!(store.pack_values().iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn set_ranges_validates_names_and_bounds() {
        let mut store = eem_store();
        let atom = BTreeMap::from([
            ("A".to_string(), ParameterRange::new(0.0, 1.0)),
            ("B".to_string(), ParameterRange::new(0.0, 1.0)),
        ]);

        let missing = BTreeMap::new();
        assert!(matches!(
            store.set_ranges(&missing, &atom),
            Err(ChargeError::MissingRange(name)) if name == "kappa"
        ));

        let inverted = BTreeMap::from([("kappa".to_string(), ParameterRange::new(1.0, 0.0))]);
        assert!(matches!(
            store.set_ranges(&inverted, &atom),
            Err(ChargeError::InvalidRange { .. })
        ));

        let too_wide = BTreeMap::from([("kappa".to_string(), ParameterRange::new(-1e308, 1e308))]);
        assert!(matches!(
            store.set_ranges(&too_wide, &atom),
            Err(ChargeError::InvalidRange { .. })
        ));

        let unknown = BTreeMap::from([("C".to_string(), ParameterRange::new(0.0, 1.0))]);
        let common = BTreeMap::from([("kappa".to_string(), ParameterRange::new(0.0, 1.0))]);
        assert!(matches!(
            store.set_ranges(&common, &unknown),
            Err(ChargeError::UnknownAtomParameter(name)) if name == "C"
        ));
    }

    #[test]
    fn json_output_round_trips() {
        let store = eem_store();
        let json = store.to_json_string().unwrap();
        let mut reloaded = ParameterStore::new(&["kappa"], &["A", "B"]).unwrap();
        reloaded.load_from_str(&json).unwrap();
        assert_eq!(reloaded, store);
    }

    #[test]
    fn display_lists_common_and_rows() {
        let text = eem_store().to_string();
        assert!(text.contains("kappa: 0.250"));
        assert!(text.contains("(C, hbo, 2): A=2.520, B=0.880"));
    }
}
