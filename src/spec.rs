//! Regression specification: response, predictors, and the variable of
//! interest
//!
//! The spec is a structured value object rather than a free-form formula
//! string, but `RegressionSpec::from_formula` accepts the familiar
//! `"y ~ x1 + x2"` form for convenience.

use crate::error::{PermTestError, Result};
use crate::table::DataTable;

/// Which fitting backend refits the model on each permuted sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressionKind {
    /// Ordinary least squares
    Ols,
    /// Huber M-estimation via iteratively reweighted least squares
    Robust,
}

/// Immutable description of the model and the coefficient under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegressionSpec {
    response: String,
    predictors: Vec<String>,
    variable: String,
}

impl RegressionSpec {
    /// Build a spec from parts
    ///
    /// Fails with `InvalidArgument` if there are no predictors, if a
    /// predictor repeats or shadows the response, or if the variable of
    /// interest is not among the predictors.
    pub fn new(response: &str, predictors: &[&str], variable: &str) -> Result<Self> {
        if response.is_empty() {
            return Err(PermTestError::InvalidArgument(
                "response name must not be empty".to_string(),
            ));
        }
        if predictors.is_empty() {
            return Err(PermTestError::InvalidArgument(
                "at least one predictor is required".to_string(),
            ));
        }
        for (i, p) in predictors.iter().enumerate() {
            if p.is_empty() {
                return Err(PermTestError::InvalidArgument(
                    "predictor names must not be empty".to_string(),
                ));
            }
            if *p == response {
                return Err(PermTestError::InvalidArgument(format!(
                    "predictor '{}' is also the response",
                    p
                )));
            }
            if predictors[..i].contains(p) {
                return Err(PermTestError::InvalidArgument(format!(
                    "duplicate predictor '{}'",
                    p
                )));
            }
        }
        if !predictors.contains(&variable) {
            return Err(PermTestError::InvalidArgument(format!(
                "variable of interest '{}' is not among the predictors {:?}",
                variable, predictors
            )));
        }

        Ok(Self {
            response: response.to_string(),
            predictors: predictors.iter().map(|p| p.to_string()).collect(),
            variable: variable.to_string(),
        })
    }

    /// Parse a formula like `"y ~ x1 + x2 + x3"` with a variable of interest
    pub fn from_formula(formula: &str, variable: &str) -> Result<Self> {
        let (lhs, rhs) = formula.split_once('~').ok_or_else(|| {
            PermTestError::InvalidArgument(format!(
                "invalid formula '{}': expected 'response ~ p1 + p2 + ...'",
                formula
            ))
        })?;

        let response = lhs.trim();
        let predictors: Vec<&str> = rhs
            .split('+')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        Self::new(response, &predictors, variable)
    }

    /// Response column name
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Predictor column names in model order
    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    /// The predictor whose coefficient is under test
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Check that every named column exists in a table
    pub fn validate_against(&self, data: &DataTable) -> Result<()> {
        if !data.has_column(&self.response) {
            return Err(PermTestError::InvalidArgument(format!(
                "response column '{}' not in data",
                self.response
            )));
        }
        for p in &self.predictors {
            if !data.has_column(p) {
                return Err(PermTestError::InvalidArgument(format!(
                    "predictor column '{}' not in data",
                    p
                )));
            }
        }
        Ok(())
    }
}
