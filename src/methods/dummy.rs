use super::{ChargeMethod, MethodOptions};
use crate::error::ChargeError;
use crate::params::ParameterStore;
use crate::structures::Molecule;

/// Assigns zero charge to every atom. Useful as a baseline when comparing methods.
#[derive(Debug, Clone, Default)]
pub struct Dummy {
    parameters: ParameterStore,
}

impl Dummy {
    pub const NAME: &'static str = "dummy";

    pub fn new() -> Self {
        Self::default()
    }
}

impl ChargeMethod for Dummy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn full_name(&self) -> &'static str {
        "Zero charges"
    }

    fn initialize(&mut self, _options: &MethodOptions) -> Result<(), ChargeError> {
        Ok(())
    }

    fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterStore {
        &mut self.parameters
    }

    fn calculate_charges(&self, molecule: &Molecule) -> Result<Vec<f64>, ChargeError> {
        Ok(vec![0.0; molecule.len()])
    }

    fn clone_box(&self) -> Box<dyn ChargeMethod> {
        Box::new(self.clone())
    }
}
