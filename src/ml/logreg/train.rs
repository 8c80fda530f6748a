use ndarray::{Array1, Array2, Axis, s};
use thiserror::Error;

use super::{LogRegError, LogRegModel, MODEL_VERSION, sigmoid, softplus};

/// Penalized Newton solver settings.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Inverse L2 strength; larger means weaker regularization.
    pub c: f64,
    /// Newton iteration budget.
    pub max_iter: usize,
    /// Stop once every gradient component is within this bound.
    pub tol: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

/// The solver ran out of budget or could not make progress.
///
/// Never fatal: the coefficients reached so far are still returned.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "logistic regression did not converge after {iterations} iterations (max |gradient| {gradient_max:.3e})"
)]
pub struct ConvergenceError {
    pub iterations: usize,
    pub gradient_max: f64,
}

/// Fitted model plus solver diagnostics.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub model: LogRegModel,
    pub iterations: usize,
    pub convergence: Option<ConvergenceError>,
}

impl FitOutcome {
    pub fn converged(&self) -> bool {
        self.convergence.is_none()
    }
}

const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-10;

/// Fit `min C * sum(logloss) + 0.5 * |w|^2` with Newton steps.
///
/// The intercept is not penalized. Labels must be 0 or 1; a single-class set is accepted and
/// drives the intercept towards that class.
pub fn train_logreg(
    x: &Array2<f64>,
    y: &[u8],
    options: &TrainOptions,
) -> Result<FitOutcome, LogRegError> {
    let (n, d) = x.dim();
    if n == 0 {
        return Err(LogRegError::EmptyTrainingSet);
    }
    if n != y.len() {
        return Err(LogRegError::LengthMismatch {
            rows: n,
            labels: y.len(),
        });
    }
    if let Some(&bad) = y.iter().find(|&&label| label > 1) {
        return Err(LogRegError::NonBinaryLabel(bad));
    }
    if !options.c.is_finite() || options.c <= 0.0 {
        return Err(LogRegError::InvalidRegularization(options.c));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(LogRegError::NonFinite);
    }

    let c = options.c;
    let design = with_bias_column(x);
    let labels: Array1<f64> = y.iter().map(|&label| f64::from(label)).collect();
    let mut theta = Array1::<f64>::zeros(d + 1);
    let mut objective = penalized_loss(&design, &labels, &theta, c);
    let mut iterations = 0usize;
    let mut converged = false;
    let mut gradient_max = f64::INFINITY;

    while iterations < options.max_iter {
        let probs = design.dot(&theta).mapv(sigmoid);
        let gradient = penalized_gradient(&design, &labels, &probs, &theta, c);
        gradient_max = gradient.iter().fold(0.0f64, |acc, g| acc.max(g.abs()));
        if gradient_max <= options.tol {
            converged = true;
            break;
        }
        let hessian = penalized_hessian(&design, &probs, c);
        let Some(step) = solve_linear(hessian, gradient.clone()) else {
            break;
        };
        let slope = gradient.dot(&step);
        let mut t = 1.0;
        let mut accepted = None;
        while t >= MIN_STEP {
            let candidate = &theta - &(&step * t);
            let value = penalized_loss(&design, &labels, &candidate, c);
            if value <= objective - ARMIJO * t * slope {
                accepted = Some((candidate, value));
                break;
            }
            t *= 0.5;
        }
        iterations += 1;
        let Some((candidate, value)) = accepted else {
            break;
        };
        let progress = objective - value;
        theta = candidate;
        objective = value;
        if progress <= 10.0 * f64::EPSILON * objective.abs().max(1.0) {
            break;
        }
    }

    // Every exit other than the gradient test is judged by the gradient at the final point.
    if !converged {
        gradient_max = max_abs_gradient(&design, &labels, &theta, c);
        converged = gradient_max <= options.tol;
    }

    let model = LogRegModel {
        model_version: MODEL_VERSION,
        encoder_fingerprint: None,
        feature_dim: d,
        weights: theta.slice(s![..d]).to_vec(),
        intercept: theta[d],
        c,
    };
    model.validate()?;
    Ok(FitOutcome {
        model,
        iterations,
        convergence: (!converged).then_some(ConvergenceError {
            iterations,
            gradient_max,
        }),
    })
}

fn max_abs_gradient(design: &Array2<f64>, labels: &Array1<f64>, theta: &Array1<f64>, c: f64) -> f64 {
    let probs = design.dot(theta).mapv(sigmoid);
    let gradient = penalized_gradient(design, labels, &probs, theta, c);
    gradient.iter().fold(0.0f64, |acc, g| acc.max(g.abs()))
}

fn with_bias_column(x: &Array2<f64>) -> Array2<f64> {
    let (n, d) = x.dim();
    let mut design = Array2::<f64>::ones((n, d + 1));
    design.slice_mut(s![.., ..d]).assign(x);
    design
}

fn penalized_loss(design: &Array2<f64>, labels: &Array1<f64>, theta: &Array1<f64>, c: f64) -> f64 {
    let d = theta.len() - 1;
    let data_loss: f64 = design
        .dot(theta)
        .iter()
        .zip(labels.iter())
        .map(|(&z, &y)| if y > 0.5 { softplus(-z) } else { softplus(z) })
        .sum();
    let penalty: f64 = theta.slice(s![..d]).iter().map(|w| w * w).sum();
    c * data_loss + 0.5 * penalty
}

fn penalized_gradient(
    design: &Array2<f64>,
    labels: &Array1<f64>,
    probs: &Array1<f64>,
    theta: &Array1<f64>,
    c: f64,
) -> Array1<f64> {
    let d = theta.len() - 1;
    let residual = probs - labels;
    let mut gradient = design.t().dot(&residual) * c;
    let mut penalized = gradient.slice_mut(s![..d]);
    penalized += &theta.slice(s![..d]);
    gradient
}

fn penalized_hessian(design: &Array2<f64>, probs: &Array1<f64>, c: f64) -> Array2<f64> {
    let cols = design.ncols();
    let curvature = probs.mapv(|p| c * p * (1.0 - p));
    let weighted = design * &curvature.view().insert_axis(Axis(1));
    let mut hessian = weighted.t().dot(design);
    for j in 0..cols - 1 {
        hessian[[j, j]] += 1.0;
    }
    hessian[[cols - 1, cols - 1]] += 1e-12;
    hessian
}

/// Gaussian elimination with partial pivoting. `None` when the system is singular.
fn solve_linear(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[[row, col]].abs() > a[[pivot, col]].abs() {
                pivot = row;
            }
        }
        let pivot_value = a[[pivot, col]];
        if !pivot_value.is_finite() || pivot_value.abs() < f64::MIN_POSITIVE {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut out = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in row + 1..n {
            sum -= a[[row, k]] * out[k];
        }
        out[row] = sum / a[[row, row]];
    }
    out.iter().all(|v| v.is_finite()).then_some(out)
}
