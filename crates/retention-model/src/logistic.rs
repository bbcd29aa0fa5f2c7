//! L2-Regularized Logistic Regression

use crate::ModelError;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::{debug, warn};

/// Maximum step halvings per Newton iteration
const MAX_LINE_SEARCH: usize = 30;

/// Binary logistic regression.
///
/// Minimizes `C * sum(logloss) + 0.5 * ||w||^2` with damped Newton steps.
/// The intercept is fitted and not penalized.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    c: f64,
    /// Maximum Newton iterations
    max_iter: usize,
    /// Convergence tolerance on the largest parameter step
    tol: f64,
    /// Fitted weights, one per input column
    coefficients: Option<Array1<f64>>,
    /// Fitted bias
    intercept: f64,
    /// Iterations used by the last fit
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    #[must_use]
    pub fn new() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
            coefficients: None,
            intercept: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the inverse regularization strength (smaller = stronger penalty)
    #[must_use]
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Fit on a design matrix and 0/1 labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ModelError> {
        let (n_samples, n_features) = x.dim();

        if n_samples == 0 {
            return Err(ModelError::EmptyInput);
        }
        if n_samples != y.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} labels", n_samples),
                actual: format!("{} labels", y.len()),
            });
        }
        if let Some(&bad) = y.iter().find(|&&label| label > 1) {
            return Err(ModelError::InvalidLabel(bad));
        }
        let positives = y.iter().filter(|&&label| label == 1).count();
        if positives == 0 || positives == n_samples {
            return Err(ModelError::DegenerateTarget(y[0]));
        }

        let target: Array1<f64> = y.iter().map(|&label| label as f64).collect();
        let mut w = Array1::<f64>::zeros(n_features);
        let mut b = 0.0;
        let mut loss = self.objective(x, &target, &w, b);
        let mut converged = false;
        self.n_iter = 0;

        for iter in 1..=self.max_iter {
            self.n_iter = iter;

            let p = (x.dot(&w) + b).mapv(sigmoid);
            let residual = &p - &target;
            let s = p.mapv(|v| v * (1.0 - v));

            // Gradient over [w, b]
            let mut grad = Array1::<f64>::zeros(n_features + 1);
            grad.slice_mut(ndarray::s![..n_features])
                .assign(&(x.t().dot(&residual) * self.c + &w));
            grad[n_features] = residual.sum() * self.c;

            // Hessian over [w, b]
            let weighted = x * &s.view().insert_axis(Axis(1));
            let mut hessian = Array2::<f64>::zeros((n_features + 1, n_features + 1));
            hessian
                .slice_mut(ndarray::s![..n_features, ..n_features])
                .assign(&(x.t().dot(&weighted) * self.c));
            for j in 0..n_features {
                hessian[(j, j)] += 1.0;
            }
            let cross = weighted.sum_axis(Axis(0)) * self.c;
            hessian
                .slice_mut(ndarray::s![..n_features, n_features])
                .assign(&cross);
            hessian
                .slice_mut(ndarray::s![n_features, ..n_features])
                .assign(&cross);
            hessian[(n_features, n_features)] = s.sum() * self.c + 1e-12;

            let step = cholesky_solve(&hessian, &grad).ok_or(ModelError::Singular)?;

            // Halve the step until the objective does not increase
            let mut scale = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_LINE_SEARCH {
                let w_new = &w - &(step.slice(ndarray::s![..n_features]).to_owned() * scale);
                let b_new = b - step[n_features] * scale;
                let new_loss = self.objective(x, &target, &w_new, b_new);
                if new_loss <= loss {
                    w = w_new;
                    b = b_new;
                    loss = new_loss;
                    accepted = true;
                    break;
                }
                scale *= 0.5;
            }

            let max_step = step.iter().fold(0.0_f64, |m, v| m.max(v.abs())) * scale;
            debug!("Newton iteration {}: objective {:.6}, step {:.3e}", iter, loss, max_step);

            if !accepted || max_step < self.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                "Logistic regression did not converge in {} iterations",
                self.max_iter
            );
        }

        self.coefficients = Some(w);
        self.intercept = b;
        Ok(())
    }

    /// Probability of class 1 for each row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let coef = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        if x.ncols() != coef.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} features", coef.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok((x.dot(coef) + self.intercept).mapv(sigmoid))
    }

    /// Class labels at a 0.5 probability cutoff
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|&p| usize::from(p >= 0.5))
            .collect())
    }

    fn objective(&self, x: &Array2<f64>, y: &Array1<f64>, w: &Array1<f64>, b: f64) -> f64 {
        let z = x.dot(w) + b;
        let logloss: f64 = z
            .iter()
            .zip(y.iter())
            .map(|(&z, &y)| softplus(z) - y * z)
            .sum();
        self.c * logloss + 0.5 * w.dot(w)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^z) without overflow
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// Solve `a * x = b` for symmetric positive-definite `a`
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[(i, k)] * l[(j, k)]).sum();
            if i == j {
                let diag = a[(i, i)] - dot;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[(i, j)] = diag.sqrt();
            } else {
                l[(i, j)] = (a[(i, j)] - dot) / l[(j, j)];
            }
        }
    }

    // Forward substitution: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let dot: f64 = (0..i).map(|k| l[(i, k)] * z[k]).sum();
        z[i] = (b[i] - dot) / l[(i, i)];
    }

    // Back substitution: L^T x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let dot: f64 = (i + 1..n).map(|k| l[(k, i)] * x[k]).sum();
        x[i] = (z[i] - dot) / l[(i, i)];
    }

    Some(x)
}

/// Mean predicted probability, used in logs
pub(crate) fn mean_probability(p: ArrayView1<f64>) -> f64 {
    if p.is_empty() {
        0.0
    } else {
        p.sum() / p.len() as f64
    }
}
