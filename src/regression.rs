//! Regression fitting backends: OLS and Huber M-estimation
//!
//! This is the fitting collaborator the permutation engine refits on every
//! permuted sample. Both backends return coefficients, standard errors, and
//! t-statistics keyed by term name (`"(intercept)"` plus the predictors).
//!
//! OLS solves the normal equations by Gauss-Jordan elimination with partial
//! pivoting. The robust backend is Huber M-estimation via iteratively
//! reweighted least squares (tuning constant 1.345, scale from the
//! normalized median absolute deviation of the residuals), with the Huber
//! asymptotic covariance for standard errors.
//!
//! # References
//!
//! Huber, P. J. (1981). Robust Statistics. Wiley.
//! Manly, B. F. J. (2007). Randomization, Bootstrap and Monte Carlo Methods
//! in Biology. Chapman & Hall.

use crate::error::{PermTestError, Result};
use crate::spec::{RegressionKind, RegressionSpec};
use crate::table::DataTable;
use std::collections::HashMap;

/// Term name used for the intercept column
pub const INTERCEPT: &str = "(intercept)";

/// Huber tuning constant (95% efficiency under normal errors)
const HUBER_C: f64 = 1.345;

/// MAD-to-sigma consistency factor for normal data (1 / 0.6745)
pub const MAD_CONSISTENCY: f64 = 1.4826;

/// Maximum IRLS iterations before declaring non-convergence
const MAX_IRLS_ITERATIONS: usize = 50;

/// IRLS convergence tolerance on the max coefficient change
const IRLS_TOLERANCE: f64 = 1e-8;

/// Pivot magnitude below which the normal equations count as singular
const SINGULAR_EPS: f64 = 1e-12;

/// A fitted model: estimates keyed by term name
#[derive(Debug, Clone)]
pub struct Fit {
    pub coefficients: HashMap<String, f64>,
    pub std_errors: HashMap<String, f64>,
    pub t_statistics: HashMap<String, f64>,
}

/// Fit the model described by `spec` on `data` with the requested backend
pub fn fit(spec: &RegressionSpec, data: &DataTable, kind: RegressionKind) -> Result<Fit> {
    spec.validate_against(data)?;

    let y = data.column(spec.response())?.to_vec();
    let design = build_design(spec, data)?;
    let n = y.len();
    let p = design.terms.len();

    if n <= p {
        return Err(PermTestError::RegressionFitFailure(format!(
            "{} rows cannot identify {} terms",
            n, p
        )));
    }
    if y.iter().any(|v| !v.is_finite())
        || design.rows.iter().flatten().any(|v| !v.is_finite())
    {
        return Err(PermTestError::RegressionFitFailure(
            "data contains non-finite values".to_string(),
        ));
    }

    match kind {
        RegressionKind::Ols => fit_ols(&design, &y),
        RegressionKind::Robust => fit_huber(&design, &y),
    }
}

/// Design matrix with intercept column and term names in model order
struct Design {
    terms: Vec<String>,
    /// n rows of p values each
    rows: Vec<Vec<f64>>,
}

fn build_design(spec: &RegressionSpec, data: &DataTable) -> Result<Design> {
    let n = data.n_rows();
    let mut terms = vec![INTERCEPT.to_string()];
    terms.extend(spec.predictors().iter().cloned());

    let mut rows = vec![Vec::with_capacity(terms.len()); n];
    for row in rows.iter_mut() {
        row.push(1.0);
    }
    for name in spec.predictors() {
        let col = data.column(name)?;
        for (row, &v) in rows.iter_mut().zip(col.iter()) {
            row.push(v);
        }
    }

    Ok(Design { terms, rows })
}

fn fit_ols(design: &Design, y: &[f64]) -> Result<Fit> {
    let weights = vec![1.0; y.len()];
    let (beta, xtx_inv) = weighted_least_squares(design, y, &weights)?;

    let n = y.len();
    let p = design.terms.len();
    let residuals = compute_residuals(design, y, &beta);
    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let sigma2 = rss / (n - p) as f64;

    assemble_fit(design, &beta, &xtx_inv, sigma2)
}

fn fit_huber(design: &Design, y: &[f64]) -> Result<Fit> {
    let n = y.len();
    let p = design.terms.len();

    // OLS start; keep (X'X)^-1 for the covariance at the end
    let ones = vec![1.0; n];
    let (mut beta, xtx_inv) = weighted_least_squares(design, y, &ones)?;

    let mut converged = false;
    let mut scale = 0.0;
    for _ in 0..MAX_IRLS_ITERATIONS {
        let residuals = compute_residuals(design, y, &beta);
        scale = mad(&residuals) * MAD_CONSISTENCY;
        if scale < SINGULAR_EPS {
            // Residuals have collapsed; the model interpolates the data and
            // the robust scale is undefined
            return Err(PermTestError::RegressionFitFailure(
                "robust scale estimate collapsed to zero".to_string(),
            ));
        }

        let weights: Vec<f64> = residuals
            .iter()
            .map(|r| {
                let u = (r / scale).abs();
                if u <= HUBER_C {
                    1.0
                } else {
                    HUBER_C / u
                }
            })
            .collect();

        let (next, _) = weighted_least_squares(design, y, &weights)?;
        let delta = beta
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        beta = next;

        if delta < IRLS_TOLERANCE {
            converged = true;
            break;
        }
    }

    if !converged {
        return Err(PermTestError::RegressionFitFailure(format!(
            "Huber IRLS did not converge within {} iterations",
            MAX_IRLS_ITERATIONS
        )));
    }

    // Huber asymptotic covariance: kappa * s^2 * (X'X)^-1 with
    // kappa = [n/(n-p)] * mean(psi(u)^2) / mean(psi'(u))^2
    let residuals = compute_residuals(design, y, &beta);
    let (psi2_sum, dpsi_sum) = residuals.iter().fold((0.0, 0.0), |(p2, dp), r| {
        let u = r / scale;
        let psi = u.clamp(-HUBER_C, HUBER_C);
        let dpsi = if u.abs() <= HUBER_C { 1.0 } else { 0.0 };
        (p2 + psi * psi, dp + dpsi)
    });
    let mean_dpsi = dpsi_sum / n as f64;
    if mean_dpsi < SINGULAR_EPS {
        return Err(PermTestError::RegressionFitFailure(
            "all residuals fall outside the Huber bend; covariance undefined".to_string(),
        ));
    }
    let kappa = (n as f64 / (n - p) as f64) * (psi2_sum / n as f64) / (mean_dpsi * mean_dpsi);
    let sigma2 = kappa * scale * scale;

    assemble_fit(design, &beta, &xtx_inv, sigma2)
}

fn assemble_fit(design: &Design, beta: &[f64], xtx_inv: &[Vec<f64>], sigma2: f64) -> Result<Fit> {
    let mut coefficients = HashMap::new();
    let mut std_errors = HashMap::new();
    let mut t_statistics = HashMap::new();

    for (j, term) in design.terms.iter().enumerate() {
        let variance = sigma2 * xtx_inv[j][j];
        if !variance.is_finite() || variance <= 0.0 {
            return Err(PermTestError::RegressionFitFailure(format!(
                "non-positive variance estimate for term '{}'",
                term
            )));
        }
        let se = variance.sqrt();
        coefficients.insert(term.clone(), beta[j]);
        std_errors.insert(term.clone(), se);
        t_statistics.insert(term.clone(), beta[j] / se);
    }

    Ok(Fit {
        coefficients,
        std_errors,
        t_statistics,
    })
}

/// Solve the weighted normal equations; returns (beta, (X'WX)^-1)
fn weighted_least_squares(
    design: &Design,
    y: &[f64],
    weights: &[f64],
) -> Result<(Vec<f64>, Vec<Vec<f64>>)> {
    let p = design.terms.len();

    // X'WX and X'Wy
    let mut xtwx = vec![vec![0.0; p]; p];
    let mut xtwy = vec![0.0; p];
    for (row, (&yi, &wi)) in design.rows.iter().zip(y.iter().zip(weights.iter())) {
        for j in 0..p {
            xtwy[j] += wi * row[j] * yi;
            for k in j..p {
                xtwx[j][k] += wi * row[j] * row[k];
            }
        }
    }
    for j in 0..p {
        for k in 0..j {
            xtwx[j][k] = xtwx[k][j];
        }
    }

    let inv = invert(&xtwx)?;
    let beta: Vec<f64> = (0..p)
        .map(|j| (0..p).map(|k| inv[j][k] * xtwy[k]).sum())
        .collect();

    Ok((beta, inv))
}

/// Gauss-Jordan inversion with partial pivoting
fn invert(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let p = matrix.len();
    let mut aug: Vec<Vec<f64>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..p).map(|j| if i == j { 1.0 } else { 0.0 }));
            r
        })
        .collect();

    for col in 0..p {
        // Partial pivot: largest magnitude in or below the diagonal
        let pivot_row = (col..p)
            .max_by(|&a, &b| {
                aug[a][col]
                    .abs()
                    .partial_cmp(&aug[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if aug[pivot_row][col].abs() < SINGULAR_EPS {
            return Err(PermTestError::RegressionFitFailure(
                "normal equations are singular (collinear predictors?)".to_string(),
            ));
        }
        aug.swap(col, pivot_row);

        let pivot = aug[col][col];
        for v in aug[col].iter_mut() {
            *v /= pivot;
        }
        for row in 0..p {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..2 * p {
                aug[row][k] -= factor * aug[col][k];
            }
        }
    }

    Ok(aug.into_iter().map(|row| row[p..].to_vec()).collect())
}

fn compute_residuals(design: &Design, y: &[f64], beta: &[f64]) -> Vec<f64> {
    design
        .rows
        .iter()
        .zip(y.iter())
        .map(|(row, &yi)| yi - row.iter().zip(beta.iter()).map(|(x, b)| x * b).sum::<f64>())
        .collect()
}

/// Median of a sample (average of the middle pair for even lengths)
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Raw median absolute deviation (no consistency factor)
pub fn mad(values: &[f64]) -> f64 {
    let m = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - m).abs()).collect();
    median(&deviations)
}
