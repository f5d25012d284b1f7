//! Model evaluation: one dataset in, one statistic out
//!
//! Thin orchestration over the fitting backend: refit the model on a single
//! dataset variant (observed or permuted) and pull out the coefficient and
//! t-statistic for the variable of interest. The t-statistic, not the raw
//! coefficient, is the comparison statistic: it stays comparable across
//! refits whose variance structure differs.

use crate::error::{PermTestError, Result};
use crate::regression;
use crate::spec::{RegressionKind, RegressionSpec};
use crate::table::DataTable;

/// Coefficient and t-statistic for the variable of interest from one fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub coefficient: f64,
    pub t_statistic: f64,
}

/// Refit the model on `data` and extract the statistic for the variable of
/// interest
pub fn evaluate(spec: &RegressionSpec, data: &DataTable, kind: RegressionKind) -> Result<FitResult> {
    let fit = regression::fit(spec, data, kind)?;

    let variable = spec.variable();
    let coefficient = lookup(&fit.coefficients, variable)?;
    let t_statistic = lookup(&fit.t_statistics, variable)?;

    Ok(FitResult {
        coefficient,
        t_statistic,
    })
}

fn lookup(map: &std::collections::HashMap<String, f64>, variable: &str) -> Result<f64> {
    map.get(variable)
        .copied()
        .ok_or_else(|| PermTestError::VariableNotFound {
            variable: variable.to_string(),
            available: {
                let mut names: Vec<String> = map.keys().cloned().collect();
                names.sort();
                names
            },
        })
}
