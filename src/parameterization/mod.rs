//! Fitting a charge method's parameters against reference charges.
//!
//! The search coordinate is the method's packed parameter vector. An objective evaluation loads a
//! candidate vector, recomputes the charges of every training molecule and returns the global
//! RMSD against the reference. Several independent runs start from random points, each on its own
//! copy of the method, and report their final vector to a coordinator that keeps the best one.

pub mod lbfgs;
mod options;

pub use options::{ParameterRanges, ParameterizationOptions};

use crate::charges::Charges;
use crate::error::ChargeError;
use crate::methods::ChargeMethod;
use crate::stats;
use crate::structures::MoleculeSet;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::mpsc;
use tracing::{debug, info};

/// Summary of a completed parameterization. The fitted values live in the method's store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterizationResult {
    /// Global RMSD of the committed parameters.
    pub objective: f64,
    /// Index of the winning run.
    pub run_index: usize,
    /// L-BFGS iterations of the winning run.
    pub iterations: u32,
    /// Whether the winning run met the gradient tolerance.
    pub converged: bool,
}

struct RunOutcome {
    run_index: usize,
    objective: f64,
    packed: Vec<f64>,
    iterations: u32,
    converged: bool,
}

/// Global RMSD of `method` with its store set to `packed`.
///
/// # Errors
///
/// Propagates the size check of `load_packed` and any domain error of the charge calculation.
pub fn evaluate(
    method: &mut dyn ChargeMethod,
    packed: &[f64],
    molecules: &MoleculeSet,
    reference: &Charges,
) -> Result<f64, ChargeError> {
    method.parameters_mut().load_packed(packed)?;
    let computed = method.calculate_all(molecules)?;
    Ok(stats::total(reference, &computed)?.rmsd)
}

/// Fits the parameters of `method` to `reference` and commits the best vector found.
///
/// The method's store must already hold one row per atom type of `molecules` (see
/// [`ParameterStore::init_from_set`](crate::params::ParameterStore::init_from_set)). When
/// `options.ranges` is set, the ranges are installed into the store and bound the search.
///
/// On success the caller's store holds the winning vector. On error the store is left with its
/// ranges possibly updated but its values unchanged.
///
/// # Errors
///
/// * `ChargeError::InvalidOptions` / `ChargeError::InvalidRange` for bad options.
/// * `ChargeError::EmptyTrainingSet` if `molecules` is empty.
/// * `ChargeError::MissingCharges` / `ChargeError::ChargeCountMismatch` if `reference` does not
///   cover the set.
/// * Any domain error raised while computing charges, such as an atom without parameters.
pub fn parameterize(
    molecules: &MoleculeSet,
    method: &mut dyn ChargeMethod,
    reference: &Charges,
    options: &ParameterizationOptions,
) -> Result<ParameterizationResult, ChargeError> {
    options.validate()?;
    if molecules.is_empty() {
        return Err(ChargeError::EmptyTrainingSet);
    }
    reference.validate_against(molecules)?;

    if let Some(ranges) = &options.ranges {
        method
            .parameters_mut()
            .set_ranges(&ranges.common, &ranges.atom)?;
    }

    info!(
        method = method.name(),
        molecules = molecules.len(),
        parameters = method.parameters().size(),
        population = options.population,
        "Starting parameterization."
    );

    let template: &dyn ChargeMethod = &*method;
    let (sender, receiver) = mpsc::channel();
    rayon::scope(|scope| {
        for run_index in 0..options.population {
            let sender = sender.clone();
            let candidate = template.clone_box();
            scope.spawn(move |_| {
                let outcome = run(run_index, candidate, molecules, reference, options);
                // The receiver outlives the scope, so sending cannot fail.
                let _ = sender.send(outcome);
            });
        }
    });
    drop(sender);

    let mut outcomes = Vec::with_capacity(options.population);
    let mut first_error: Option<(usize, ChargeError)> = None;
    for (run_index, outcome) in receiver {
        match outcome {
            Ok(outcome) => outcomes.push(outcome),
            Err(error) => {
                if first_error.as_ref().is_none_or(|(index, _)| run_index < *index) {
                    first_error = Some((run_index, error));
                }
            }
        }
    }
    if let Some((_, error)) = first_error {
        return Err(error);
    }

    let best = outcomes
        .into_iter()
        .min_by(|a, b| {
            a.objective
                .total_cmp(&b.objective)
                .then(a.run_index.cmp(&b.run_index))
        })
        .ok_or_else(|| ChargeError::InvalidOptions("population must be at least 1".to_string()))?;

    method.parameters_mut().load_packed(&best.packed)?;

    info!(
        run = best.run_index,
        objective = best.objective,
        iterations = best.iterations,
        converged = best.converged,
        "Parameterization finished."
    );

    Ok(ParameterizationResult {
        objective: best.objective,
        run_index: best.run_index,
        iterations: best.iterations,
        converged: best.converged,
    })
}

fn run(
    run_index: usize,
    mut method: Box<dyn ChargeMethod>,
    molecules: &MoleculeSet,
    reference: &Charges,
    options: &ParameterizationOptions,
) -> (usize, Result<RunOutcome, ChargeError>) {
    let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(run_index as u64));
    method.parameters_mut().set_random_values(&mut rng);

    let mut packed = method.parameters().pack_values();
    let bounds = method.parameters().packed_bounds();
    let config = options.lbfgs_config();

    let result = lbfgs::minimize(
        |candidate: &[f64]| evaluate(method.as_mut(), candidate, molecules, reference),
        &mut packed,
        bounds.as_deref(),
        &config,
    );

    let outcome = result.map(|result| {
        debug!(
            run = run_index,
            objective = result.value,
            iterations = result.iterations,
            converged = result.converged,
            "Run finished."
        );
        RunOutcome {
            run_index,
            objective: result.value,
            packed,
            iterations: result.iterations,
            converged: result.converged,
        }
    });

    (run_index, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Plain;
    use crate::methods::{Eem, create_method};
    use crate::params::ParameterRange;
    use crate::periodic;
    use crate::structures::{Atom, Molecule};
    use std::collections::BTreeMap;

    fn water(name: &str, stretch: f64) -> Molecule {
        let atoms = vec![
            Atom::new(periodic::by_symbol("O").unwrap(), [0.0, 0.0, 0.0], 0),
            Atom::new(periodic::by_symbol("H").unwrap(), [0.96 * stretch, 0.0, 0.0], 0),
            Atom::new(
                periodic::by_symbol("H").unwrap(),
                [-0.24 * stretch, 0.93 * stretch, 0.0],
                0,
            ),
        ];
        Molecule::new(name, atoms, &[]).unwrap()
    }

    fn training_set() -> MoleculeSet {
        let mut set = MoleculeSet::new(vec![
            water("w1", 1.0),
            water("w2", 1.1),
            water("w3", 0.9),
        ])
        .unwrap();
        set.classify_atoms(&Plain);
        set
    }

    fn reference_for(set: &MoleculeSet) -> Charges {
        let mut eem = Eem::new();
        eem.parameters_mut().init_from_set(set).unwrap();
        eem.parameters_mut().set_common("kappa", 0.4).unwrap();
        let layout = eem.parameters().layout();
        let mut packed = eem.parameters().pack_values();
        for (r, row) in eem.parameters().rows().iter().enumerate() {
            let (a, b) = if row.key.element == "O" { (2.6, 1.1) } else { (2.3, 0.9) };
            packed[layout.atom_index(r, 0)] = a;
            packed[layout.atom_index(r, 1)] = b;
        }
        eem.parameters_mut().load_packed(&packed).unwrap();
        eem.calculate_all(set).unwrap()
    }

    fn ranged_options(population: usize) -> ParameterizationOptions {
        let common = BTreeMap::from([("kappa".to_string(), ParameterRange::new(0.1, 0.8))]);
        let atom = BTreeMap::from([
            ("A".to_string(), ParameterRange::new(2.0, 3.0)),
            ("B".to_string(), ParameterRange::new(0.5, 1.5)),
        ]);
        ParameterizationOptions {
            population,
            max_iterations: 40,
            ranges: Some(ParameterRanges { common, atom }),
            ..Default::default()
        }
    }

    fn fresh_eem(set: &MoleculeSet) -> Box<dyn ChargeMethod> {
        let mut method = create_method("eem").unwrap();
        method.parameters_mut().init_from_set(set).unwrap();
        method
    }

    #[test]
    fn evaluate_is_zero_at_reference_parameters() {
        let set = training_set();
        let reference = reference_for(&set);
        let mut method = fresh_eem(&set);

        // Rows are created in first-seen order: O, then H.
        let packed = [0.4, 2.6, 1.1, 2.3, 0.9];
        let rmsd = evaluate(method.as_mut(), &packed, &set, &reference).unwrap();
        assert!(rmsd < 1e-12, "rmsd = {rmsd}");
        assert_eq!(method.parameters().pack_values(), packed);

        let off = evaluate(method.as_mut(), &[0.4, 2.9, 1.1, 2.3, 0.9], &set, &reference).unwrap();
        assert!(off > 1e-3);
    }

    #[test]
    fn fit_reduces_objective_and_commits_winner() {
        let set = training_set();
        let reference = reference_for(&set);
        let mut method = fresh_eem(&set);

        let result = parameterize(&set, method.as_mut(), &reference, &ranged_options(2)).unwrap();

        assert!(result.run_index < 2);
        let committed = method.parameters().pack_values();
        let recomputed = evaluate(method.as_mut(), &committed, &set, &reference).unwrap();
        assert_eq!(recomputed, result.objective);
        assert!(result.objective < 0.05, "objective = {}", result.objective);

        for value in &committed[1..] {
            assert!((0.5..=3.0).contains(value));
        }
    }

    #[test]
    fn larger_population_is_never_worse() {
        let set = training_set();
        let reference = reference_for(&set);

        let mut single = fresh_eem(&set);
        let one = parameterize(&set, single.as_mut(), &reference, &ranged_options(1)).unwrap();

        let mut multi = fresh_eem(&set);
        let three = parameterize(&set, multi.as_mut(), &reference, &ranged_options(3)).unwrap();

        assert!(three.objective <= one.objective);
    }

    #[test]
    fn same_seed_gives_same_result() {
        let set = training_set();
        let reference = reference_for(&set);
        let options = ranged_options(2);

        let mut first = fresh_eem(&set);
        let a = parameterize(&set, first.as_mut(), &reference, &options).unwrap();
        let mut second = fresh_eem(&set);
        let b = parameterize(&set, second.as_mut(), &reference, &options).unwrap();

        assert_eq!(a, b);
        assert_eq!(first.parameters(), second.parameters());
    }

    #[test]
    fn rejects_empty_set_and_incomplete_reference() {
        let empty = MoleculeSet::new(Vec::new()).unwrap();
        let mut method = create_method("eem").unwrap();
        assert!(matches!(
            parameterize(&empty, method.as_mut(), &Charges::new(), &Default::default()),
            Err(ChargeError::EmptyTrainingSet)
        ));

        let set = training_set();
        let mut reference = reference_for(&set);
        reference.insert("w2", vec![0.0]);
        let mut method = fresh_eem(&set);
        let before = method.parameters().clone();
        assert!(matches!(
            parameterize(&set, method.as_mut(), &reference, &ranged_options(1)),
            Err(ChargeError::ChargeCountMismatch { .. })
        ));
        assert_eq!(method.parameters().rows(), before.rows());
    }

    #[test]
    fn domain_errors_abort_the_fit() {
        let set = training_set();
        let reference = reference_for(&set);
        let mut method = create_method("eem").unwrap();
        let err = parameterize(&set, method.as_mut(), &reference, &Default::default()).unwrap_err();
        assert!(matches!(err, ChargeError::NoMatchingParameters { .. }));
    }

    #[test]
    fn method_without_parameters_is_evaluated_once() {
        let set = training_set();
        let reference = reference_for(&set);
        let mut method = create_method("formal").unwrap();
        let result = parameterize(&set, method.as_mut(), &reference, &Default::default()).unwrap();
        assert_eq!(result.iterations, 0);
        assert!(result.converged);
        assert_eq!(result.run_index, 0);
    }
}
