//! permtest - Permutation significance testing for partial regression coefficients
//!
//! This library computes an empirical null distribution for a single partial
//! regression coefficient by repeatedly refitting the model on
//! response-permuted copies of the data (Manly's procedure), then compares
//! the observed t-statistic against that null to derive a two-sided
//! permutation p-value. Refitting supports ordinary least squares and a
//! Huber-robust backend, serially or across a worker pool.

pub mod builder;
pub mod cli;
pub mod error;
pub mod evaluate;
pub mod permute;
pub mod pvalue;
pub mod regression;
pub mod report;
pub mod runner;
pub mod spec;
pub mod table;
pub mod winsor;

pub use builder::{FailurePolicy, NullEnsemble};
pub use error::{PermTestError, Result};
pub use runner::{PermTestConfig, PermutationTestResult};
pub use spec::{RegressionKind, RegressionSpec};
pub use table::DataTable;
