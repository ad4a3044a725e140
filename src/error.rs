use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all fallible operations in the `chargefit` library.
///
/// Domain errors (unknown parameter names, duplicate rows, unmatched atoms) abort the current
/// operation and are handed back to the caller. A singular linear system is *not* an error:
/// charge methods report it as a NaN-filled charge vector instead.
#[derive(Error, Debug)]
pub enum ChargeError {
    /// An I/O error that occurred while reading or writing a data file.
    #[error("I/O error at path '{}': {source}", .path.display())]
    Io {
        /// The path of the file that caused the I/O error.
        path: PathBuf,
        /// The underlying `std::io::Error`.
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON in a parameter or charges file.
    #[error("Failed to parse JSON data: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML in a parameterization options file.
    #[error("Failed to deserialize TOML options: {0}")]
    Toml(#[from] toml::de::Error),

    /// A charge method declared the same parameter name twice.
    #[error("Parameter name '{0}' is declared more than once")]
    DuplicateParameterName(String),

    /// A common parameter name that the charge method does not declare.
    #[error("Common parameter '{0}' is not defined for this method")]
    UnknownCommonParameter(String),

    /// An atom parameter name that the charge method does not declare.
    #[error("Atom parameter '{0}' is not defined for this method")]
    UnknownAtomParameter(String),

    /// Two atom rows share the same (element, scheme, tag) key.
    #[error("Atom parameters for {0} are already defined")]
    DuplicateAtomRow(String),

    /// An atom row carries the wrong number of numeric values.
    #[error("Atom row {key} has {actual} values, expected {expected}")]
    InvalidRowLength {
        key: String,
        expected: usize,
        actual: usize,
    },

    /// No atom row of the parameter store matches this atom.
    #[error("No suitable parameters found for atom {element}{index} in molecule '{molecule}'")]
    NoMatchingParameters {
        element: String,
        index: usize,
        molecule: String,
    },

    /// An atom was used before an atom type was assigned to it.
    #[error("Atom {element}{index} in molecule '{molecule}' has no assigned atom type")]
    UntypedAtom {
        element: String,
        index: usize,
        molecule: String,
    },

    /// A classification scheme name with no registered classifier.
    #[error("Classification scheme '{0}' is not defined")]
    UnknownClassifier(String),

    /// A charge method name with no registered constructor.
    #[error("Charge method '{0}' is not available")]
    UnknownMethod(String),

    /// An element symbol missing from the periodic table.
    #[error("Unknown element symbol: '{0}'")]
    UnknownElement(String),

    /// A packed parameter vector whose length differs from the store size.
    #[error("Packed vector has {actual} values, expected {expected}")]
    PackedSizeMismatch { expected: usize, actual: usize },

    /// A parameter range with inverted or non-finite bounds.
    #[error("Invalid range for parameter '{name}': [{low}, {high}]")]
    InvalidRange { name: String, low: f64, high: f64 },

    /// Ranges were declared for some parameter names but not for this one.
    #[error("No range declared for parameter '{0}'")]
    MissingRange(String),

    /// A bond that references an atom outside its molecule.
    #[error("Bond {first}-{second} in molecule '{molecule}' references a missing atom")]
    InvalidBond {
        molecule: String,
        first: usize,
        second: usize,
    },

    /// Two molecules in one set share a name.
    #[error("Two molecules share the name '{0}'")]
    DuplicateMolecule(String),

    /// A charge collection has no entry for a molecule that is being compared.
    #[error("No charges available for molecule '{0}'")]
    MissingCharges(String),

    /// A charge vector whose length differs from the molecule's atom count.
    #[error("Molecule '{name}' has {expected} atoms but {actual} charges were given")]
    ChargeCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Parameterization was requested on an empty molecule set.
    #[error("Training set contains no molecules")]
    EmptyTrainingSet,

    /// Parameterization options failed validation.
    #[error("Invalid parameterization options: {0}")]
    InvalidOptions(String),
}
