//! Charge calculation methods.
//!
//! Every method implements [`ChargeMethod`] over its own [`ParameterStore`]. Methods are created
//! by name through a static registry so front ends can offer them without knowing the concrete
//! types.

mod dummy;
mod eem;
mod formal;

pub use dummy::Dummy;
pub use eem::Eem;
pub use formal::FormalCharges;

use crate::charges::Charges;
use crate::error::ChargeError;
use crate::params::ParameterStore;
use crate::structures::{Molecule, MoleculeSet};
use rayon::prelude::*;
use std::path::PathBuf;

/// Options passed to [`ChargeMethod::initialize`].
#[derive(Debug, Clone, Default)]
pub struct MethodOptions {
    /// A JSON parameter file to load into the method's store.
    pub parameter_file: Option<PathBuf>,
}

/// A strategy computing partial charges for a molecule from a parameter store.
///
/// `calculate_charges` only reads the store, so one method instance can serve many molecules
/// in parallel. Anything that mutates the store concurrently must work on its own
/// [`clone_box`](ChargeMethod::clone_box) copy.
pub trait ChargeMethod: Send + Sync {
    /// Short registry name, e.g. `"eem"`.
    fn name(&self) -> &'static str;

    /// Human-readable method name.
    fn full_name(&self) -> &'static str;

    /// DOI of the publication describing the method, if any.
    fn publication(&self) -> Option<&'static str> {
        None
    }

    /// Prepares the method, typically by loading its parameters.
    fn initialize(&mut self, options: &MethodOptions) -> Result<(), ChargeError>;

    fn parameters(&self) -> &ParameterStore;

    fn parameters_mut(&mut self) -> &mut ParameterStore;

    /// Charges of `molecule`, one per atom in atom index order.
    ///
    /// An unsolvable system yields NaN charges rather than an error; errors are reserved for
    /// domain problems such as an atom without parameters.
    fn calculate_charges(&self, molecule: &Molecule) -> Result<Vec<f64>, ChargeError>;

    /// An independent copy of the method and its parameters.
    fn clone_box(&self) -> Box<dyn ChargeMethod>;

    /// Charges of every molecule of the set, computed in parallel.
    fn calculate_all(&self, molecules: &MoleculeSet) -> Result<Charges, ChargeError> {
        molecules
            .molecules()
            .par_iter()
            .map(|molecule| {
                self.calculate_charges(molecule)
                    .map(|charges| (molecule.name().to_string(), charges))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|entries| entries.into_iter().collect())
    }
}

impl Clone for Box<dyn ChargeMethod> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

type Constructor = fn() -> Box<dyn ChargeMethod>;

fn new_eem() -> Box<dyn ChargeMethod> {
    Box::new(Eem::new())
}

fn new_formal() -> Box<dyn ChargeMethod> {
    Box::new(FormalCharges::new())
}

fn new_dummy() -> Box<dyn ChargeMethod> {
    Box::new(Dummy::new())
}

static METHODS: &[(&str, Constructor)] = &[
    (Eem::NAME, new_eem),
    (FormalCharges::NAME, new_formal),
    (Dummy::NAME, new_dummy),
];

/// Names of all registered methods.
pub fn available_methods() -> Vec<&'static str> {
    METHODS.iter().map(|(name, _)| *name).collect()
}

/// Creates an uninitialized method by name.
///
/// # Errors
///
/// Returns `ChargeError::UnknownMethod` if no method of that name is registered.
pub fn create_method(name: &str) -> Result<Box<dyn ChargeMethod>, ChargeError> {
    METHODS
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, constructor)| constructor())
        .ok_or_else(|| ChargeError::UnknownMethod(name.to_string()))
}
