use super::{ChargeMethod, MethodOptions};
use crate::error::ChargeError;
use crate::params::ParameterStore;
use crate::structures::{Atom, Molecule};

/// Reports each atom's formal charge as its partial charge. Has no parameters.
#[derive(Debug, Clone, Default)]
pub struct FormalCharges {
    parameters: ParameterStore,
}

impl FormalCharges {
    pub const NAME: &'static str = "formal";

    pub fn new() -> Self {
        Self::default()
    }
}

impl ChargeMethod for FormalCharges {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn full_name(&self) -> &'static str {
        "Formal charges"
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
        Ok(molecule
            .atoms()
            .iter()
            .map(Atom::formal_charge)
            .map(f64::from)
            .collect())
    }

    fn clone_box(&self) -> Box<dyn ChargeMethod> {
        Box::new(self.clone())
    }
}
