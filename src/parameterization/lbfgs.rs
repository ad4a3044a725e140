// Box-constrained L-BFGS for black-box objectives.
//
// - Two-loop recursion for the inverse Hessian approximation
// - Gradient by central finite differences (one-sided at a bound)
// - Trial points projected onto the bounds; components pinned at an active bound are frozen
// - Backtracking line search with the Armijo condition on the projected step
//
// Reference: Nocedal & Wright, "Numerical Optimization", 2nd ed., Algorithm 7.4/7.5

use crate::params::ParameterRange;
use std::collections::VecDeque;
use tracing::trace;

/// Configuration for the L-BFGS minimizer.
#[derive(Debug, Clone)]
pub struct LbfgsConfig {
    /// Maximum number of L-BFGS iterations.
    pub max_iterations: u32,
    /// Convergence tolerance on the RMS of the projected gradient.
    pub gradient_tolerance: f64,
    /// Number of (s, y) vector pairs kept in memory.
    pub memory_size: usize,
    /// Relative finite-difference step; the absolute step is `h * max(1, |x_i|)`.
    pub finite_difference_step: f64,
    /// Armijo condition parameter (c1) for the backtracking line search.
    pub line_search_c1: f64,
    /// Minimum step size before the line search gives up.
    pub line_search_min_step: f64,
    /// Maximum number of backtracking steps in the line search.
    pub line_search_max_iter: u32,
    /// Largest change of any single coordinate in the first trial of a line search.
    pub max_step: f64,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            gradient_tolerance: 1e-6,
            memory_size: 8,
            finite_difference_step: 1e-6,
            line_search_c1: 1e-4,
            line_search_min_step: 1e-12,
            line_search_max_iter: 40,
            max_step: 1.0,
        }
    }
}

/// Outcome of a minimization. The coordinates are left in the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbfgsResult {
    /// Objective value at the final coordinates.
    pub value: f64,
    /// Number of accepted iterations.
    pub iterations: u32,
    /// Whether the projected gradient fell below the tolerance.
    pub converged: bool,
}

/// Minimizes `objective` starting from `x`, which is overwritten with the best point found.
///
/// Every accepted step strictly satisfies the Armijo condition, so the returned value is never
/// worse than the value at the (projected) starting point. Running out of iterations or stalling
/// in the line search is reported through `converged`, not as an error.
///
/// # Errors
///
/// Propagates the first error returned by `objective`.
pub fn minimize<F, E>(
    mut objective: F,
    x: &mut [f64],
    bounds: Option<&[ParameterRange]>,
    config: &LbfgsConfig,
) -> Result<LbfgsResult, E>
where
    F: FnMut(&[f64]) -> Result<f64, E>,
{
    let n = x.len();
    project(x, bounds);
    let mut value = objective(x)?;

    if n == 0 {
        return Ok(LbfgsResult {
            value,
            iterations: 0,
            converged: true,
        });
    }

    let m = config.memory_size.max(1);
    let mut history: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::with_capacity(m);

    let mut grad = gradient(&mut objective, x, bounds, config.finite_difference_step)?;
    let mut x_new = vec![0.0; n];
    let mut d = vec![0.0; n];

    let mut iterations = 0u32;
    let mut converged = false;

    for _ in 0..config.max_iterations {
        let pg = projected_gradient(x, &grad, bounds);
        let pg_rms = (dot(&pg, &pg) / n as f64).sqrt();
        if pg_rms < config.gradient_tolerance {
            converged = true;
            break;
        }

        // d = -H_k * g_k via the two-loop recursion.
        d.copy_from_slice(&pg);
        let mut alpha = vec![0.0; history.len()];
        for (i, (s, y, rho)) in history.iter().enumerate().rev() {
            alpha[i] = rho * dot(s, &d);
            axpy(-alpha[i], y, &mut d);
        }
        if let Some((s, y, _)) = history.back() {
            let yy = dot(y, y);
            if yy > 0.0 {
                let gamma = dot(s, y) / yy;
                d.iter_mut().for_each(|dj| *dj *= gamma);
            }
        }
        for (i, (s, y, rho)) in history.iter().enumerate() {
            let beta = rho * dot(y, &d);
            axpy(alpha[i] - beta, s, &mut d);
        }
        for (dj, pgj) in d.iter_mut().zip(&pg) {
            *dj = if *pgj == 0.0 { 0.0 } else { -*dj };
        }

        // Not a descent direction: fall back to steepest descent.
        if dot(&d, &pg) >= 0.0 {
            history.clear();
            for (dj, pgj) in d.iter_mut().zip(&pg) {
                *dj = -pgj;
            }
        }

        let max_component = d.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        let mut step = if max_component > config.max_step {
            config.max_step / max_component
        } else {
            1.0
        };

        let mut value_new = value;
        let mut accepted = false;
        for _ in 0..config.line_search_max_iter {
            for j in 0..n {
                x_new[j] = x[j] + step * d[j];
            }
            project(&mut x_new, bounds);

            let decrease: f64 = (0..n).map(|j| grad[j] * (x_new[j] - x[j])).sum();
            value_new = objective(&x_new)?;
            if value_new.is_finite() && value_new <= value + config.line_search_c1 * decrease {
                accepted = decrease < 0.0 || value_new < value;
                break;
            }
            step *= 0.5;
            if step < config.line_search_min_step {
                break;
            }
        }

        if !accepted {
            break;
        }

        let grad_new = gradient(&mut objective, &x_new, bounds, config.finite_difference_step)?;
        let s: Vec<f64> = (0..n).map(|j| x_new[j] - x[j]).collect();
        let y: Vec<f64> = (0..n).map(|j| grad_new[j] - grad[j]).collect();
        let sy = dot(&s, &y);

        x.copy_from_slice(&x_new);
        value = value_new;
        grad = grad_new;

        // Keep the pair only if the curvature condition holds.
        if sy > 1e-10 {
            if history.len() == m {
                history.pop_front();
            }
            history.push_back((s, y, 1.0 / sy));
        }

        iterations += 1;
        trace!(iteration = iterations, value, step, "Accepted L-BFGS step.");
    }

    Ok(LbfgsResult {
        value,
        iterations,
        converged,
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(ai, bi)| ai * bi).sum()
}

fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

fn project(x: &mut [f64], bounds: Option<&[ParameterRange]>) {
    if let Some(bounds) = bounds {
        for (xi, range) in x.iter_mut().zip(bounds) {
            *xi = range.clamp(*xi);
        }
    }
}

/// Gradient with components that would push through an active bound set to zero.
fn projected_gradient(x: &[f64], grad: &[f64], bounds: Option<&[ParameterRange]>) -> Vec<f64> {
    match bounds {
        None => grad.to_vec(),
        Some(bounds) => x
            .iter()
            .zip(grad)
            .zip(bounds)
            .map(|((&xi, &gi), range)| {
                let at_low = xi <= range.low && gi > 0.0;
                let at_high = xi >= range.high && gi < 0.0;
                if at_low || at_high { 0.0 } else { gi }
            })
            .collect(),
    }
}

fn gradient<F, E>(
    objective: &mut F,
    x: &[f64],
    bounds: Option<&[ParameterRange]>,
    relative_step: f64,
) -> Result<Vec<f64>, E>
where
    F: FnMut(&[f64]) -> Result<f64, E>,
{
    let mut probe = x.to_vec();
    let mut grad = vec![0.0; x.len()];

    for i in 0..x.len() {
        let origin = x[i];
        let h = relative_step * origin.abs().max(1.0);
        let (low, high) = bounds
            .map(|b| (b[i].low, b[i].high))
            .unwrap_or((f64::NEG_INFINITY, f64::INFINITY));

        let plus = if origin + h <= high { origin + h } else { origin };
        let minus = if origin - h >= low { origin - h } else { origin };
        if plus == minus {
            continue;
        }

        probe[i] = plus;
        let f_plus = objective(&probe)?;
        probe[i] = minus;
        let f_minus = objective(&probe)?;
        probe[i] = origin;

        let g = (f_plus - f_minus) / (plus - minus);
        grad[i] = if g.is_finite() { g } else { 0.0 };
    }

    Ok(grad)
}
