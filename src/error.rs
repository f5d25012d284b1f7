//! Error taxonomy for the permutation test engine
//!
//! Fatal errors unwind to the caller with their specific kind; there is no
//! silent fallback to a different regression kind or a reduced permutation
//! count unless lenient mode was explicitly requested.

use thiserror::Error;

/// Errors for permutation test operations
#[derive(Error, Debug)]
pub enum PermTestError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Variable '{variable}' not found in fitted coefficients (available: {available:?})")]
    VariableNotFound {
        variable: String,
        available: Vec<String>,
    },

    #[error("Regression fit failed: {0}")]
    RegressionFitFailure(String),

    #[error("Incomplete null ensemble: {succeeded} of {requested} fits succeeded")]
    IncompleteEnsemble { succeeded: usize, requested: usize },

    #[error("Cannot compute a p-value from an empty null ensemble")]
    EmptyEnsemble,

    #[error("Data table error: {0}")]
    Table(String),
}

pub type Result<T> = std::result::Result<T, PermTestError>;
