//! Empirical partial atomic charges and the fitting of their parameters.
//!
//! A charge method (such as [`Eem`]) reads per-atom-type coefficients from a [`ParameterStore`]
//! and computes one partial charge per atom of a [`Molecule`]. Atoms are matched to coefficient
//! rows through atom types assigned by a [`Classifier`]. The [`parameterize`] entry point fits a
//! method's coefficients against reference [`Charges`], using the [`stats`] metrics as objective.

pub mod charges;
pub mod classifier;
pub mod error;
pub mod methods;
pub mod parameterization;
pub mod params;
pub mod periodic;
pub mod stats;
pub mod structures;

pub use charges::Charges;
pub use classifier::{
    AtomTypeKey, Classifier, ClassifierRegistry, HighestBondOrder, ParametrizedClassifier, Plain,
    default_registry,
};
pub use error::ChargeError;
pub use methods::{
    ChargeMethod, Dummy, Eem, FormalCharges, MethodOptions, available_methods, create_method,
};
pub use parameterization::{
    ParameterRanges, ParameterizationOptions, ParameterizationResult, parameterize,
};
pub use params::{AtomParameterRow, PackLayout, ParameterRange, ParameterStore};
pub use stats::Statistics;
pub use structures::{Atom, Bond, Molecule, MoleculeSet, TypeCount};
