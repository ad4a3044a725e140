//! Electronegativity Equalization Method.
//!
//! For a molecule of `n` atoms the charges solve the `(n + 1) x (n + 1)` system
//!
//! ```text
//! | B_1       k/r_12  ...  1 | | q_1 |   | -A_1 |
//! | k/r_21    B_2     ...  1 | | q_2 |   | -A_2 |
//! | ...                      | | ... | = | ...  |
//! | 1         1       ...  0 | | -X  |   |  Q   |
//! ```
//!
//! where `k` is the common parameter `kappa`, `A_i` and `B_i` come from atom `i`'s parameter row,
//! and `Q` is the molecule's formal charge. The last row enforces charge conservation.

use super::{ChargeMethod, MethodOptions};
use crate::error::ChargeError;
use crate::params::ParameterStore;
use crate::structures::Molecule;
use faer::{Col, Mat, prelude::*};
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

const KAPPA: &str = "kappa";
const COMMON_PARAMETERS: [&str; 1] = [KAPPA];
const ATOM_PARAMETERS: [&str; 2] = ["A", "B"];

/// The EEM charge model with one common parameter (`kappa`) and two atom parameters (`A`, `B`).
#[derive(Debug, Clone)]
pub struct Eem {
    parameters: ParameterStore,
    a_index: usize,
    b_index: usize,
}

impl Eem {
    pub const NAME: &'static str = "eem";

    pub fn new() -> Self {
        Self {
            parameters: ParameterStore::with_names(&COMMON_PARAMETERS, &ATOM_PARAMETERS),
            a_index: 0,
            b_index: 1,
        }
    }

    /// Assembles the EEM matrix and right-hand side for `molecule`.
    fn build_system(&self, molecule: &Molecule) -> Result<(Mat<f64>, Col<f64>), ChargeError> {
        let n_atoms = molecule.len();
        let matrix_size = n_atoms + 1;
        let kappa = self.parameters.common(KAPPA)?;

        let mut a = Mat::zeros(matrix_size, matrix_size);
        let mut b = Col::zeros(matrix_size);

        for (i, atom) in molecule.atoms().iter().enumerate() {
            let key = atom.atom_type().ok_or_else(|| ChargeError::UntypedAtom {
                element: atom.symbol().to_string(),
                index: i,
                molecule: molecule.name().to_string(),
            })?;
            let row = self
                .parameters
                .row(key)
                .ok_or_else(|| ChargeError::NoMatchingParameters {
                    element: atom.symbol().to_string(),
                    index: i,
                    molecule: molecule.name().to_string(),
                })?;

            a[(i, i)] = row.values[self.b_index];
            b[i] = -row.values[self.a_index];

            for j in (i + 1)..n_atoms {
                let value = kappa / molecule.distance(i, j);
                a[(i, j)] = value;
                a[(j, i)] = value;
            }
        }

        a.col_mut(matrix_size - 1)
            .subrows_mut(0, n_atoms)
            .fill(1.0);
        a.row_mut(matrix_size - 1).subcols_mut(0, n_atoms).fill(1.0);

        b[matrix_size - 1] = f64::from(molecule.formal_charge());

        Ok((a, b))
    }
}

impl Default for Eem {
    fn default() -> Self {
        Self::new()
    }
}

impl ChargeMethod for Eem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn full_name(&self) -> &'static str {
        "Electronegativity Equalization Method"
    }

    fn publication(&self) -> Option<&'static str> {
        Some("10.1021/ja00275a013")
    }

    fn initialize(&mut self, options: &MethodOptions) -> Result<(), ChargeError> {
        if let Some(path) = &options.parameter_file {
            self.parameters.load_from_file(path)?;
        }
        Ok(())
    }

    fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterStore {
        &mut self.parameters
    }

    /// Solves the EEM system of `molecule`.
    ///
    /// A singular or ill-posed system (for example two atoms at the same coordinates, which
    /// makes an off-diagonal entry infinite) yields a vector of NaN instead of an error.
    fn calculate_charges(&self, molecule: &Molecule) -> Result<Vec<f64>, ChargeError> {
        let n_atoms = molecule.len();
        if n_atoms == 0 {
            return Ok(Vec::new());
        }

        let (a, b) = self.build_system(molecule)?;
        let unsolvable = || {
            warn!(
                molecule = molecule.name(),
                "EEM system is singular; charges set to NaN."
            );
            Ok(vec![f64::NAN; n_atoms])
        };

        let finite_system = (0..=n_atoms).all(|i| (0..=n_atoms).all(|j| a[(i, j)].is_finite()));
        if !finite_system {
            return unsolvable();
        }

        let solve_result = panic::catch_unwind(AssertUnwindSafe(|| a.partial_piv_lu().solve(&b)));
        let solution = match solve_result {
            Ok(sol) => sol,
            Err(_) => return unsolvable(),
        };

        let charges: Vec<f64> = (0..n_atoms).map(|i| solution[i]).collect();
        if charges.iter().any(|q| !q.is_finite()) {
            return unsolvable();
        }
        Ok(charges)
    }

    fn clone_box(&self) -> Box<dyn ChargeMethod> {
        Box::new(self.clone())
    }
}
