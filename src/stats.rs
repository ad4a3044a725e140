//! Error metrics between reference and computed charges.
//!
//! [`total`] averages per-molecule metrics over the set and is the parameterization objective
//! (through its `rmsd`). [`per_atom_type`] pools individual atom charges by atom type across the
//! whole set and is a reporting view only.
//!
//! Molecules whose charges contain NaN (an unsolvable linear system) are excluded from the
//! averages, so a single degenerate molecule never poisons the global metrics.

use crate::charges::Charges;
use crate::classifier::AtomTypeKey;
use crate::error::ChargeError;
use crate::structures::MoleculeSet;
use std::fmt;
use tracing::warn;

/// Aggregate agreement between two charge samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Root-mean-square deviation.
    pub rmsd: f64,
    /// Squared Pearson correlation coefficient.
    pub pearson_squared: f64,
    /// Mean absolute difference.
    pub avg_abs_diff: f64,
    /// Maximum absolute difference.
    pub max_abs_diff: f64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Statistics(rmsd={:.3}, R2={:.3}, avg={:.3}, max={:.3})",
            self.rmsd, self.pearson_squared, self.avg_abs_diff, self.max_abs_diff
        )
    }
}

/// Computes the four metrics over two equally long, NaN-free samples.
///
/// When either sample has zero variance the correlation is undefined; it is reported as `1.0`
/// if the samples are identical and `0.0` otherwise.
pub fn compare(reference: &[f64], computed: &[f64]) -> Statistics {
    debug_assert_eq!(reference.len(), computed.len());
    let n = reference.len().max(1) as f64;

    let mut sum_sq = 0.0;
    let mut sum_abs = 0.0;
    let mut max_abs = 0.0f64;
    for (x, y) in reference.iter().zip(computed) {
        let diff = (x - y).abs();
        sum_sq += diff * diff;
        sum_abs += diff;
        max_abs = max_abs.max(diff);
    }

    Statistics {
        rmsd: (sum_sq / n).sqrt(),
        pearson_squared: pearson_squared(reference, computed),
        avg_abs_diff: sum_abs / n,
        max_abs_diff: max_abs,
    }
}

fn pearson_squared(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().max(1) as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denominator = sxx * syy;
    if denominator > 0.0 {
        sxy * sxy / denominator
    } else if x == y {
        1.0
    } else {
        0.0
    }
}

fn has_nan(values: &[f64]) -> bool {
    values.iter().any(|v| v.is_nan())
}

/// Averages per-molecule statistics over all molecules of `reference`.
///
/// Molecules with a NaN on either side are counted but excluded from the sums. The averages
/// divide by the number of valid molecules, floored at one.
///
/// # Errors
///
/// Returns `ChargeError::MissingCharges` if `computed` lacks a molecule of `reference`, and
/// `ChargeError::ChargeCountMismatch` if the two vectors of a molecule differ in length.
pub fn total(reference: &Charges, computed: &Charges) -> Result<Statistics, ChargeError> {
    let mut sums = Statistics {
        rmsd: 0.0,
        pearson_squared: 0.0,
        avg_abs_diff: 0.0,
        max_abs_diff: 0.0,
    };
    let mut bad_molecules = 0usize;

    for (name, x) in reference.iter() {
        let y = computed.for_molecule(name, x.len())?;
        if has_nan(x) || has_nan(y) {
            bad_molecules += 1;
            continue;
        }

        let stats = compare(x, y);
        sums.rmsd += stats.rmsd;
        sums.pearson_squared += stats.pearson_squared;
        sums.avg_abs_diff += stats.avg_abs_diff;
        sums.max_abs_diff += stats.max_abs_diff;
    }

    let valid = reference.len() - bad_molecules;
    if valid == 0 && !reference.is_empty() {
        warn!(
            molecules = reference.len(),
            "Every molecule was excluded from the statistics."
        );
    }
    let n = valid.max(1) as f64;

    Ok(Statistics {
        rmsd: sums.rmsd / n,
        pearson_squared: sums.pearson_squared / n,
        avg_abs_diff: sums.avg_abs_diff / n,
        max_abs_diff: sums.max_abs_diff / n,
    })
}

/// Pools atom charges by atom type across the set and computes statistics per type.
///
/// Types appear in first-seen order. Atoms with a NaN on either side are skipped; a type left
/// without any valid atom is omitted.
///
/// # Errors
///
/// Returns `ChargeError::UntypedAtom` for an unclassified atom, and the lookup errors of
/// [`Charges::for_molecule`] for missing or mis-sized charge vectors.
pub fn per_atom_type(
    molecules: &MoleculeSet,
    reference: &Charges,
    computed: &Charges,
) -> Result<Vec<(AtomTypeKey, Statistics)>, ChargeError> {
    let mut results = Vec::new();

    for (key, indices) in molecules.atom_type_indices()? {
        let mut x = Vec::with_capacity(indices.len());
        let mut y = Vec::with_capacity(indices.len());

        for (m, a) in indices {
            let molecule = &molecules.molecules()[m];
            let ref_q = reference.for_molecule(molecule.name(), molecule.len())?[a];
            let calc_q = computed.for_molecule(molecule.name(), molecule.len())?[a];
            if ref_q.is_nan() || calc_q.is_nan() {
                continue;
            }
            x.push(ref_q);
            y.push(calc_q);
        }

        if !x.is_empty() {
            results.push((key, compare(&x, &y)));
        }
    }

    Ok(results)
}
